//! Scoped in-memory document storage
//!
//! Documents live in named scopes. Each scope holds its documents in
//! first-ingest order; ingesting an existing name replaces its chunk list
//! wholesale.


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{DocqaError, Result};
use crate::embeddings::{Embedder, slice_pages};
use crate::scope::registry::{ScopeRegistry, read_lock, write_lock};

/// A page-sized slice of a document with its fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 1-based page number
    pub page: u32,
    pub text: String,
    pub fingerprint: Vec<f32>,
}

/// Pre-chunked page as supplied by a caller
///
/// A missing page number defaults to 1 and missing text to the empty string.
/// Page numbers start at 1; page 0 is rejected at ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PageInput {
    #[inline]
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            text: Some(text.into()),
        }
    }
}

/// One entry of a document listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    #[serde(rename = "pages")]
    pub page_count: usize,
    pub scope: String,
}

/// Store-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub scopes: usize,
    pub documents: usize,
}

/// Read-only view of one document, shared with the ranker
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub name: String,
    pub chunks: Arc<[Chunk]>,
}

#[derive(Debug, Default)]
struct ScopeDocuments {
    documents: Vec<DocumentSnapshot>,
}

impl ScopeDocuments {
    fn replace(&mut self, name: &str, chunks: Arc<[Chunk]>) {
        match self.documents.iter_mut().find(|doc| doc.name == name) {
            Some(existing) => existing.chunks = chunks,
            None => self.documents.push(DocumentSnapshot {
                name: name.to_string(),
                chunks,
            }),
        }
    }
}

/// In-memory scope → document → chunks mapping
pub struct ChunkStore {
    embedder: Arc<dyn Embedder>,
    scopes: ScopeRegistry<ScopeDocuments>,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("embedder", &self.embedder.name())
            .field("scopes", &self.scopes.len())
            .finish()
    }
}

impl ChunkStore {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            scopes: ScopeRegistry::default(),
        }
    }

    /// Backend used to fingerprint ingested pages
    #[inline]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Replace the chunk list of `(scope, name)` with `pages`
    ///
    /// Returns the number of stored chunks.
    ///
    /// # Errors
    /// Returns a validation error, leaving the scope untouched, when a page
    /// number is 0.
    #[inline]
    pub fn ingest(&self, scope: &str, name: &str, pages: Vec<PageInput>) -> Result<usize> {
        let chunks = self.fingerprint(pages)?;
        let count = chunks.len();
        self.replace(scope, name, chunks.into());
        info!("Ingested '{}' into scope '{}' ({} pages)", name, scope, count);
        Ok(count)
    }

    /// Replace `name` in every scope of `scopes`
    ///
    /// Fingerprints are computed once; each scope then receives its own copy
    /// of the chunk list.
    #[inline]
    pub fn ingest_many(
        &self,
        scopes: &[String],
        name: &str,
        pages: Vec<PageInput>,
    ) -> Result<usize> {
        let chunks = self.fingerprint(pages)?;
        for scope in scopes {
            self.replace(scope, name, Arc::from(chunks.as_slice()));
        }

        info!(
            "Ingested '{}' into {:?} ({} pages)",
            name,
            scopes,
            chunks.len()
        );
        Ok(chunks.len())
    }

    /// Slice `text` into pages of `slice_size` characters and ingest them
    #[inline]
    pub fn ingest_raw_text(
        &self,
        scope: &str,
        name: &str,
        text: &str,
        slice_size: usize,
    ) -> Result<usize> {
        let pages = slice_pages(text, slice_size)?
            .into_iter()
            .map(|slice| PageInput::new(slice.page, slice.text))
            .collect();
        self.ingest(scope, name, pages)
    }

    /// List documents across `scopes`, in scope order then first-ingest order
    ///
    /// Unknown scopes contribute nothing.
    #[inline]
    pub fn list(&self, scopes: &[String]) -> Vec<DocumentSummary> {
        let mut summaries = Vec::new();
        for scope in scopes {
            let Some(slot) = self.scopes.get(scope) else {
                continue;
            };
            let documents = read_lock(&slot);
            summaries.extend(documents.documents.iter().map(|doc| DocumentSummary {
                name: doc.name.clone(),
                page_count: doc.chunks.len(),
                scope: scope.clone(),
            }));
        }
        summaries
    }

    /// Documents of one scope, cheap to clone and safe to read without locks
    #[inline]
    pub fn snapshot(&self, scope: &str) -> Vec<DocumentSnapshot> {
        self.scopes
            .get(scope)
            .map(|slot| read_lock(&slot).documents.clone())
            .unwrap_or_default()
    }

    #[inline]
    pub fn stats(&self) -> StoreStats {
        let documents = self
            .scopes
            .all()
            .iter()
            .map(|slot| read_lock(slot).documents.len())
            .sum();

        StoreStats {
            scopes: self.scopes.len(),
            documents,
        }
    }

    fn fingerprint(&self, pages: Vec<PageInput>) -> Result<Vec<Chunk>> {
        if pages.iter().any(|input| input.page == Some(0)) {
            return Err(DocqaError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }

        Ok(pages
            .into_iter()
            .map(|input| {
                let text = input.text.unwrap_or_default();
                Chunk {
                    page: input.page.unwrap_or(1),
                    fingerprint: self.embedder.embed(&text),
                    text,
                }
            })
            .collect())
    }

    fn replace(&self, scope: &str, name: &str, chunks: Arc<[Chunk]>) {
        let slot = self.scopes.get_or_create(scope);
        write_lock(&slot).replace(name, chunks);
        debug!("Replaced document '{}' in scope '{}'", name, scope);
    }
}
