//! Similarity ranking over stored chunks


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::ChunkStore;
use crate::{DocqaError, Result};

/// Default excerpt length for search previews, in characters
pub const DEFAULT_PREVIEW_EXCERPT_CHARS: usize = 800;
/// Default excerpt length for answer context, in characters
pub const DEFAULT_ANSWER_EXCERPT_CHARS: usize = 1200;

/// Which excerpt length a ranked hit carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcerptBound {
    Preview,
    Answer,
}

/// Character limits for each [`ExcerptBound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcerptLimits {
    pub preview: usize,
    pub answer: usize,
}

impl Default for ExcerptLimits {
    #[inline]
    fn default() -> Self {
        Self {
            preview: DEFAULT_PREVIEW_EXCERPT_CHARS,
            answer: DEFAULT_ANSWER_EXCERPT_CHARS,
        }
    }
}

impl ExcerptLimits {
    #[inline]
    pub fn chars_for(&self, bound: ExcerptBound) -> usize {
        match bound {
            ExcerptBound::Preview => self.preview,
            ExcerptBound::Answer => self.answer,
        }
    }
}

/// A scored chunk reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub scope: String,
    pub doc: String,
    pub page: u32,
    pub excerpt: String,
    pub score: f32,
}

/// Cosine similarity of two fingerprints
///
/// Returns 0.0 when either vector is empty or has zero magnitude, when the
/// lengths differ, and when the result is not finite.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

/// Ranks chunks of a [`ChunkStore`] against a query
#[derive(Debug, Clone)]
pub struct Ranker {
    store: Arc<ChunkStore>,
    limits: ExcerptLimits,
}

impl Ranker {
    #[inline]
    pub fn new(store: Arc<ChunkStore>, limits: ExcerptLimits) -> Self {
        Self { store, limits }
    }

    #[inline]
    pub fn limits(&self) -> ExcerptLimits {
        self.limits
    }

    /// Return at most `k` hits across `scopes`, best first
    ///
    /// Candidates are visited in scope order, then document order, then
    /// page order; equal scores keep that order. When `allow_list` is
    /// non-empty only the named documents are considered.
    ///
    /// # Errors
    /// Returns a validation error when the query is blank or `k` is zero.
    #[inline]
    pub fn rank(
        &self,
        query: &str,
        scopes: &[String],
        k: usize,
        allow_list: Option<&[String]>,
        bound: ExcerptBound,
    ) -> Result<Vec<Hit>> {
        if query.trim().is_empty() {
            return Err(DocqaError::Validation("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(DocqaError::Validation("k must be at least 1".to_string()));
        }

        let allow_list = allow_list.filter(|names| !names.is_empty());
        let query_vector = self.store.embedder().embed(query);
        let excerpt_chars = self.limits.chars_for(bound);

        let snapshots: Vec<_> = scopes
            .iter()
            .map(|scope| (scope, self.store.snapshot(scope)))
            .collect();

        let mut scored = Vec::new();
        for (scope, documents) in &snapshots {
            for document in documents {
                if allow_list.is_some_and(|names| !names.contains(&document.name)) {
                    continue;
                }
                for chunk in document.chunks.iter() {
                    let score = cosine_similarity(&query_vector, &chunk.fingerprint);
                    scored.push((score, *scope, &document.name, chunk));
                }
            }
        }

        let candidates = scored.len();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let hits: Vec<Hit> = scored
            .into_iter()
            .take(k)
            .map(|(score, scope, doc, chunk)| Hit {
                scope: scope.clone(),
                doc: doc.clone(),
                page: chunk.page,
                excerpt: excerpt(&chunk.text, excerpt_chars),
                score,
            })
            .collect();

        debug!(
            "Ranked {} candidates across {:?}, returning {}",
            candidates,
            scopes,
            hits.len()
        );

        Ok(hits)
    }
}

/// First `max_chars` characters of `text`
#[inline]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
