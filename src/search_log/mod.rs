//! Append-only per-scope interaction log


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ranking::Hit;
use crate::scope::registry::{ScopeRegistry, read_lock, write_lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Hit>>,
}

#[derive(Debug, Default)]
struct ScopeLog {
    entries: Vec<LogEntry>,
}

/// Scope-keyed log of user and assistant turns
#[derive(Debug, Default)]
pub struct SearchLog {
    scopes: ScopeRegistry<ScopeLog>,
}

impl SearchLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time; returns the new length
    #[inline]
    pub fn append(
        &self,
        scope: &str,
        role: Role,
        content: impl Into<String>,
        citations: Option<Vec<Hit>>,
    ) -> usize {
        let entry = LogEntry {
            timestamp: Utc::now(),
            role,
            content: content.into(),
            citations,
        };

        let slot = self.scopes.get_or_create(scope);
        let mut log = write_lock(&slot);
        log.entries.push(entry);
        debug!("Appended {:?} entry to '{}'", role, scope);
        log.entries.len()
    }

    /// Snapshot of the entries of `scope`, oldest first
    #[inline]
    pub fn entries(&self, scope: &str) -> Vec<LogEntry> {
        self.scopes
            .get(scope)
            .map(|slot| read_lock(&slot).entries.clone())
            .unwrap_or_default()
    }

    /// Move every entry of `src` to the end of `dst`, returning the count
    ///
    /// Both scopes are locked together, in key order, so concurrent appends
    /// land either before or after the move. Moving a scope onto itself
    /// moves nothing.
    #[inline]
    pub fn migrate(&self, src: &str, dst: &str) -> usize {
        if src == dst {
            return 0;
        }

        let Some(source) = self.scopes.get(src) else {
            return 0;
        };
        if read_lock(&source).entries.is_empty() {
            return 0;
        }
        let destination = self.scopes.get_or_create(dst);

        let (mut source_log, mut destination_log) = if src < dst {
            let source_log = write_lock(&source);
            let destination_log = write_lock(&destination);
            (source_log, destination_log)
        } else {
            let destination_log = write_lock(&destination);
            let source_log = write_lock(&source);
            (source_log, destination_log)
        };

        let moved = source_log.entries.len();
        destination_log.entries.append(&mut source_log.entries);
        drop(destination_log);
        drop(source_log);

        if moved > 0 {
            info!("Migrated {} log entries from '{}' to '{}'", moved, src, dst);
        }
        moved
    }

    /// Remove every entry of `scope`, returning how many were removed
    #[inline]
    pub fn clear(&self, scope: &str) -> usize {
        let Some(slot) = self.scopes.get(scope) else {
            return 0;
        };

        let removed = std::mem::take(&mut write_lock(&slot).entries).len();
        if removed > 0 {
            info!("Cleared {} log entries from '{}'", removed, scope);
        }
        removed
    }
}
