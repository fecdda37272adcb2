//! Shared result types for the retrieval paths.

use serde::{Deserialize, Serialize};

/// A fragment identifier.
///
/// Dense, monotonically increasing, assigned at vector-index insertion
/// time. The join key between the vector index, the lexical index, and
/// external metadata storage.
pub type Fid = u64;

/// A single scored retrieval hit.
///
/// Score semantics depend on the source: cosine similarity in [-1, 1] from
/// the vector index, BM25 in [0, ∞) from the lexical index, or a
/// reciprocal-rank-fused value after merging. Fused scores from different
/// queries are not comparable in absolute terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    /// Fragment identifier.
    pub fid: Fid,
    /// Relevance score, higher is more relevant.
    pub score: f32,
}

impl ScoredFragment {
    /// Create a new scored fragment.
    pub fn new(fid: Fid, score: f32) -> Self {
        Self { fid, score }
    }
}

/// Sort hits descending by score, breaking exact ties by fid for a stable
/// order.
pub fn sort_by_score_desc(hits: &mut [ScoredFragment]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.fid.cmp(&b.fid))
    });
}
