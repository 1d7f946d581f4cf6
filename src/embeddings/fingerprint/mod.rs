//! Text fingerprinting backends
//!
//! An [`Embedder`] maps text to a fixed-shape vector. Implementations are
//! total and deterministic: every input, including the empty string,
//! produces a vector of [`Embedder::dimensions`] components.


use std::sync::Arc;

use tracing::debug;

use crate::config::{EmbeddingBackend, EmbeddingConfig};

/// Number of leading characters considered by [`MeanCodepointEmbedder`]
const MEAN_CODEPOINT_WINDOW: usize = 2048;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Pluggable fingerprint backend
pub trait Embedder: Send + Sync {
    /// Backend identifier, used in logs and health output
    fn name(&self) -> &str;

    /// Length of every vector returned by [`Embedder::embed`]
    fn dimensions(&self) -> usize;

    /// Fingerprint `text`. Must not fail.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Single-scalar placeholder: normalized mean character code of the text
///
/// Only the first 2048 characters count. Any two non-zero fingerprints
/// have cosine similarity 1.0, so ranking falls back to iteration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanCodepointEmbedder;

impl Embedder for MeanCodepointEmbedder {
    #[inline]
    fn name(&self) -> &str {
        "mean-codepoint"
    }

    #[inline]
    fn dimensions(&self) -> usize {
        1
    }

    #[inline]
    fn embed(&self, text: &str) -> Vec<f32> {
        let (sum, count) = text
            .chars()
            .take(MEAN_CODEPOINT_WINDOW)
            .fold((0_u64, 0_u64), |(sum, count), ch| {
                (sum + u64::from(u32::from(ch)), count + 1)
            });

        if count == 0 {
            return vec![0.0];
        }

        let mean = sum as f64 / count as f64;
        vec![(mean / 255.0) as f32]
    }
}

/// FNV-1a feature hashing over lower-cased alphanumeric tokens
///
/// Each token adds a signed unit to one bucket; the result is L2-normalized.
/// Text without tokens maps to the all-zeros vector.
#[derive(Debug, Clone, Copy)]
pub struct HashedTokenEmbedder {
    dimensions: usize,
}

impl HashedTokenEmbedder {
    #[inline]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for HashedTokenEmbedder {
    #[inline]
    fn name(&self) -> &str {
        "hashed-token"
    }

    #[inline]
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[inline]
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];

        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let magnitude = vector.iter().map(|c| c * c).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for component in &mut vector {
                *component /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Instantiate the configured backend
#[inline]
pub fn build_embedder(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::MeanCodepoint => Arc::new(MeanCodepointEmbedder),
        EmbeddingBackend::HashedToken => Arc::new(HashedTokenEmbedder::new(config.dimensions)),
    };

    debug!(
        "Using {} embedder with {} dimensions",
        embedder.name(),
        embedder.dimensions()
    );

    embedder
}
