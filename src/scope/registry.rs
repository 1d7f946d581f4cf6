//! Per-scope lock slots shared by the chunk store and the search log

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Maps scope keys to independently locked slots
///
/// The registry lock is only held long enough to look up or insert a slot;
/// callers then lock the slot itself.
#[derive(Debug)]
pub(crate) struct ScopeRegistry<T> {
    slots: RwLock<HashMap<String, Arc<RwLock<T>>>>,
}

impl<T> Default for ScopeRegistry<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Default> ScopeRegistry<T> {
    /// Existing slot for `key`, without creating one
    pub(crate) fn get(&self, key: &str) -> Option<Arc<RwLock<T>>> {
        read_lock(&self.slots).get(key).map(Arc::clone)
    }

    /// Slot for `key`, creating an empty one on first use
    pub(crate) fn get_or_create(&self, key: &str) -> Arc<RwLock<T>> {
        if let Some(slot) = self.get(key) {
            return slot;
        }

        let mut slots = write_lock(&self.slots);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Number of scopes that have been written to
    pub(crate) fn len(&self) -> usize {
        read_lock(&self.slots).len()
    }

    /// Snapshot of every slot, in no particular order
    pub(crate) fn all(&self) -> Vec<Arc<RwLock<T>>> {
        read_lock(&self.slots).values().map(Arc::clone).collect()
    }
}

/// Acquire a read guard, recovering from poisoning
///
/// Every critical section in this crate leaves its data consistent, so a
/// panic in another holder does not invalidate the contents.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write guard, recovering from poisoning
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
