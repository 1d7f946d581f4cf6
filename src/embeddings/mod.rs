// Embeddings module
// Text slicing into pages and the fingerprint backends used for similarity ranking

pub mod chunking;
pub mod fingerprint;

pub use chunking::{DEFAULT_SLICE_SIZE, PageSlice, slice_pages};
pub use fingerprint::{Embedder, HashedTokenEmbedder, MeanCodepointEmbedder, build_embedder};
