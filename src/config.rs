//! Configuration for the retrieval engine.

use serde::{Deserialize, Serialize};

/// Configuration shared by the indexes, the fusion step, and the facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Embedding dimension every stored vector must match.
    pub dimension: usize,
    /// Default number of final results per query.
    pub top_k: usize,
    /// Over-fetch multiplier applied to each source list before fusion.
    ///
    /// A fragment ranked low in one source but unseen in a narrower
    /// window would be unfairly excluded from fusion, so each index is
    /// asked for `top_k * overfetch_factor` candidates in hybrid mode.
    pub overfetch_factor: usize,
    /// Reciprocal rank fusion constant (the κ in `1 / (κ + rank)`).
    pub rrf_k: f32,
    /// Multiplier applied to a fused score when a query keyword appears
    /// in the fragment's document title.
    pub title_boost: f32,
    /// Query tokens must be strictly longer than this to count as
    /// title-boost keywords.
    pub min_keyword_len: usize,
    /// Storage name for the vector index snapshot.
    pub vector_snapshot: String,
    /// Storage name for the lexical index snapshot.
    pub lexical_snapshot: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            top_k: 5,
            overfetch_factor: 10,
            rrf_k: 60.0,
            title_boost: 3.0,
            min_keyword_len: 2,
            vector_snapshot: "vector_index.bin".to_string(),
            lexical_snapshot: "lexical_index.bin".to_string(),
        }
    }
}

impl RetrievalConfig {
    /// Window size requested from each source list in hybrid mode.
    pub fn overfetch_window(&self, k: usize) -> usize {
        k.saturating_mul(self.overfetch_factor).max(k)
    }
}
