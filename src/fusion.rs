//! Reciprocal rank fusion of vector and lexical rankings.
//!
//! RRF is rank-based, not score-based: each source contributes
//! `1 / (κ + rank)` for every fragment it returned, so bounded cosine
//! similarities and unbounded BM25 scores merge without any normalization
//! step. A fragment near the top of both lists dominates the fused order.
//!
//! After fusion, hybrid retrieval applies a title boost: fragments whose
//! source-document title contains a query keyword get their fused score
//! multiplied. The boost runs after fusion so it cannot mask which raw
//! signal found a fragment.

use ahash::AHashMap;
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::metadata::TitleProvider;
use crate::types::{Fid, ScoredFragment, sort_by_score_desc};

/// Fuses ranked lists and applies the title-boost heuristic.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    rrf_k: f32,
    title_boost: f32,
    min_keyword_len: usize,
}

impl FusionEngine {
    /// Create a fusion engine from the retrieval configuration.
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            rrf_k: config.rrf_k,
            title_boost: config.title_boost,
            min_keyword_len: config.min_keyword_len,
        }
    }

    /// Merge two ranked lists with reciprocal rank fusion.
    ///
    /// Each input list is assumed score-descending; ranks are 1-based in
    /// list order. Returns up to `k` fragments, fused-score descending.
    /// Two empty inputs produce an empty output, and a fragment absent
    /// from both inputs never appears.
    pub fn fuse(
        &self,
        vector_results: &[ScoredFragment],
        lexical_results: &[ScoredFragment],
        k: usize,
    ) -> Vec<ScoredFragment> {
        let mut scores: AHashMap<Fid, f32> =
            AHashMap::with_capacity(vector_results.len() + lexical_results.len());

        for source in [vector_results, lexical_results] {
            for (rank, hit) in source.iter().enumerate() {
                *scores.entry(hit.fid).or_insert(0.0) += 1.0 / (self.rrf_k + (rank + 1) as f32);
            }
        }

        let mut fused: Vec<ScoredFragment> = scores
            .into_iter()
            .map(|(fid, score)| ScoredFragment::new(fid, score))
            .collect();
        sort_by_score_desc(&mut fused);
        fused.truncate(k);
        fused
    }

    /// Extract title-boost keywords from the query.
    ///
    /// Whitespace-delimited tokens strictly longer than the configured
    /// floor, lowercased. Short tokens ("a", "is", "py") match too many
    /// titles to carry signal.
    pub fn query_keywords(&self, query: &str) -> Vec<String> {
        query
            .split_whitespace()
            .filter(|t| t.len() > self.min_keyword_len)
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Multiply the score of every fragment whose document title contains
    /// a query keyword.
    ///
    /// Titles come from the external metadata collaborator; a lookup
    /// failure degrades to no boost rather than failing the query. The
    /// list is re-sorted after boosting.
    pub fn apply_title_boost(
        &self,
        fused: &mut Vec<ScoredFragment>,
        query: &str,
        titles: &dyn TitleProvider,
    ) {
        let keywords = self.query_keywords(query);
        if keywords.is_empty() || fused.is_empty() {
            return;
        }

        let fids: Vec<Fid> = fused.iter().map(|h| h.fid).collect();
        let title_map = match titles.titles_for(&fids) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "title lookup failed, skipping boost");
                return;
            }
        };

        for hit in fused.iter_mut() {
            if hit.score <= 0.0 {
                continue;
            }
            let Some(title) = title_map.get(&hit.fid) else {
                continue;
            };
            let title = title.to_lowercase();
            if keywords.iter().any(|kw| title.contains(kw.as_str())) {
                hit.score *= self.title_boost;
            }
        }

        sort_by_score_desc(fused);
    }

    /// Fuse, boost, and truncate in one step for the hybrid path.
    pub fn fuse_with_boost(
        &self,
        vector_results: &[ScoredFragment],
        lexical_results: &[ScoredFragment],
        query: &str,
        k: usize,
        titles: &dyn TitleProvider,
    ) -> Result<Vec<ScoredFragment>> {
        // Boost before truncation would let a low-ranked boosted fragment
        // overtake; boosting over the fused window, then truncating,
        // keeps the recommended over-fetch meaningful.
        let mut fused = self.fuse(vector_results, lexical_results, usize::MAX);
        self.apply_title_boost(&mut fused, query, titles);
        fused.truncate(k);
        Ok(fused)
    }
}
