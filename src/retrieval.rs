//! Retrieval facade: the single entry point for queries.
//!
//! [`RetrievalEngine`] owns the two indexes, the fusion engine, and the
//! collaborator seams (embedder, title provider, storage). Callers pick a
//! [`SearchMode`]; the engine embeds the query when needed, runs one or
//! both index paths, fuses in hybrid mode, and reports embedding and
//! retrieval wall-clock time separately in whole milliseconds.
//!
//! Index state is held as `Arc` snapshots behind `parking_lot` read-write
//! locks: searches clone the `Arc` under a brief read lock and scan
//! without holding it, while writers copy-on-write or build aside and
//! swap. Concurrent readers always observe a consistent pre- or
//! post-rebuild index, never a partially built one.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RetrievalConfig;
use crate::embedding::TextEmbedder;
use crate::error::{FathomError, Result};
use crate::fusion::FusionEngine;
use crate::lexical_index::LexicalIndex;
use crate::metadata::TitleProvider;
use crate::storage::Storage;
use crate::types::{Fid, ScoredFragment};
use crate::vector::Vector;
use crate::vector_index::FlatVectorIndex;

/// Which retrieval path to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Pure semantic search against the vector index.
    Vector,
    /// Pure BM25 search against the lexical index.
    Lexical,
    /// Both paths, merged with reciprocal rank fusion and title boost.
    #[default]
    Hybrid,
}

impl SearchMode {
    /// Parse a mode string, degrading gracefully.
    ///
    /// Unrecognized values map to [`SearchMode::Hybrid`] rather than
    /// erroring; this is a documented contract, not fallthrough. `"bm25"`
    /// is accepted as a legacy spelling of the lexical mode.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "vector" => SearchMode::Vector,
            "lexical" | "bm25" => SearchMode::Lexical,
            _ => SearchMode::Hybrid,
        }
    }
}

/// Rule-based answer confidence derived from vector similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Top cosine similarity above 0.80.
    High,
    /// Top cosine similarity above 0.60.
    Medium,
    /// No strong semantic match, or no similarity signal at all.
    Low,
}

impl Confidence {
    /// Grade the best cosine similarity seen on the vector path.
    pub fn from_top_similarity(top: Option<f32>) -> Self {
        match top {
            Some(score) if score > 0.80 => Confidence::High,
            Some(score) if score > 0.60 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// Per-call latency record, wall-clock, whole milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    /// Time spent in the embedding collaborator.
    pub embed_ms: u64,
    /// Time spent fetching (and, in hybrid mode, fusing) results.
    pub retrieval_ms: u64,
}

/// The outcome of one retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Ranked hits, score descending. Callers resolve fids against
    /// metadata storage themselves.
    pub results: Vec<ScoredFragment>,
    /// The mode that actually ran.
    pub mode: SearchMode,
    /// Semantic-match confidence grade.
    pub confidence: Confidence,
    /// Stage timings for this call.
    pub metrics: RetrievalMetrics,
}

/// The hybrid retrieval engine facade.
pub struct RetrievalEngine {
    config: RetrievalConfig,
    vector: RwLock<Arc<FlatVectorIndex>>,
    lexical: RwLock<Arc<LexicalIndex>>,
    fusion: FusionEngine,
    embedder: Arc<dyn TextEmbedder>,
    titles: Arc<dyn TitleProvider>,
    storage: Arc<dyn Storage>,
}

impl RetrievalEngine {
    /// Create an engine with empty indexes.
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn TextEmbedder>,
        titles: Arc<dyn TitleProvider>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        if embedder.dimension() != config.dimension {
            return Err(FathomError::dimension_mismatch(
                config.dimension,
                embedder.dimension(),
            ));
        }
        let fusion = FusionEngine::new(&config);
        let vector = FlatVectorIndex::new(config.dimension);
        Ok(Self {
            config,
            vector: RwLock::new(Arc::new(vector)),
            lexical: RwLock::new(Arc::new(LexicalIndex::new())),
            fusion,
            embedder,
            titles,
            storage,
        })
    }

    /// Create an engine, restoring both indexes from snapshots when
    /// present and starting empty otherwise.
    ///
    /// A snapshot that exists but fails to decode surfaces as
    /// [`FathomError::CorruptSnapshot`], so the process can choose between
    /// starting empty and aborting.
    pub fn open(
        config: RetrievalConfig,
        embedder: Arc<dyn TextEmbedder>,
        titles: Arc<dyn TitleProvider>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let engine = Self::new(config, embedder, titles, storage)?;

        if let Some(index) = FlatVectorIndex::restore(
            engine.storage.as_ref(),
            engine.config.dimension,
            &engine.config.vector_snapshot,
        )? {
            *engine.vector.write() = Arc::new(index);
        } else {
            info!("no vector snapshot found, starting empty");
        }

        if let Some(index) =
            LexicalIndex::restore(engine.storage.as_ref(), &engine.config.lexical_snapshot)?
        {
            *engine.lexical.write() = Arc::new(index);
        } else {
            info!("no lexical snapshot found, starting empty");
        }

        Ok(engine)
    }

    /// The engine configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Number of vectors currently indexed.
    pub fn vector_count(&self) -> usize {
        self.vector.read().len()
    }

    /// Number of documents in the lexical corpus.
    pub fn lexical_count(&self) -> usize {
        self.lexical.read().len()
    }

    /// Append vectors to the vector index, returning assigned fids.
    ///
    /// Copy-on-write: in-flight searches keep scanning the snapshot they
    /// already hold.
    pub fn add_vectors(&self, vectors: Vec<Vector>) -> Result<Vec<Fid>> {
        let mut guard = self.vector.write();
        Arc::make_mut(&mut guard).add(vectors)
    }

    /// Rebuild the lexical index over a fresh corpus snapshot.
    ///
    /// The new index is built aside and swapped in; concurrent readers
    /// see the old index until the swap.
    pub fn rebuild_lexical(&self, corpus: &[(Fid, String)]) {
        let mut fresh = LexicalIndex::new();
        fresh.build(corpus);
        *self.lexical.write() = Arc::new(fresh);
    }

    /// Persist both indexes. Empty indexes are skipped, never clobbering
    /// prior durable state.
    pub fn persist_all(&self) -> Result<()> {
        let vector = Arc::clone(&self.vector.read());
        let lexical = Arc::clone(&self.lexical.read());
        vector.persist(self.storage.as_ref(), &self.config.vector_snapshot)?;
        lexical.persist(self.storage.as_ref(), &self.config.lexical_snapshot)?;
        Ok(())
    }

    /// Answer a query in the requested mode.
    ///
    /// `k` bounds the final result count; hybrid mode over-fetches each
    /// source by the configured factor before fusing.
    pub fn retrieve(&self, query: &str, k: usize, mode: SearchMode) -> Result<RetrievalResponse> {
        match mode {
            SearchMode::Vector => self.retrieve_vector(query, k),
            SearchMode::Lexical => self.retrieve_lexical(query, k),
            SearchMode::Hybrid => self.retrieve_hybrid(query, k),
        }
    }

    fn retrieve_vector(&self, query: &str, k: usize) -> Result<RetrievalResponse> {
        let embed_start = Instant::now();
        let query_vector = self.embedder.embed(query)?;
        let embed_ms = embed_start.elapsed().as_millis() as u64;

        let index = Arc::clone(&self.vector.read());
        let search_start = Instant::now();
        let results = index.search(&query_vector, k)?;
        let retrieval_ms = search_start.elapsed().as_millis() as u64;

        let confidence = Confidence::from_top_similarity(results.first().map(|h| h.score));
        Ok(RetrievalResponse {
            results,
            mode: SearchMode::Vector,
            confidence,
            metrics: RetrievalMetrics {
                embed_ms,
                retrieval_ms,
            },
        })
    }

    fn retrieve_lexical(&self, query: &str, k: usize) -> Result<RetrievalResponse> {
        let index = Arc::clone(&self.lexical.read());
        let search_start = Instant::now();
        let results = index.search(query, k);
        let retrieval_ms = search_start.elapsed().as_millis() as u64;

        Ok(RetrievalResponse {
            results,
            mode: SearchMode::Lexical,
            // BM25 scores carry no cosine-similarity signal to grade.
            confidence: Confidence::Low,
            metrics: RetrievalMetrics {
                embed_ms: 0,
                retrieval_ms,
            },
        })
    }

    fn retrieve_hybrid(&self, query: &str, k: usize) -> Result<RetrievalResponse> {
        // An embedding failure here is a vector-path failure: hybrid
        // degrades to lexical-only instead of failing the whole query.
        let embed_start = Instant::now();
        let query_vector = match self.embedder.embed(query) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "embedding failed, degrading to lexical-only");
                None
            }
        };
        let embed_ms = embed_start.elapsed().as_millis() as u64;

        let vector_index = Arc::clone(&self.vector.read());
        let lexical_index = Arc::clone(&self.lexical.read());
        let window = self.config.overfetch_window(k);

        let retrieval_start = Instant::now();

        let vector_hits = match &query_vector {
            Some(v) => match vector_index.search(v, window) {
                Ok(hits) => Some(hits),
                Err(e) => {
                    warn!(error = %e, "vector path failed, degrading to lexical-only");
                    None
                }
            },
            None => None,
        };
        let lexical_hits = lexical_index.search(query, window);

        // Total failure: the vector path errored and the lexical index
        // has never been built, so no path could have answered.
        if vector_hits.is_none() && lexical_index.is_empty() && !vector_index.is_empty() {
            return Err(FathomError::IndexUnavailable);
        }

        let vector_hits = vector_hits.unwrap_or_default();
        let top_similarity = vector_hits.first().map(|h| h.score);

        let results = self.fusion.fuse_with_boost(
            &vector_hits,
            &lexical_hits,
            query,
            k,
            self.titles.as_ref(),
        )?;
        let retrieval_ms = retrieval_start.elapsed().as_millis() as u64;

        Ok(RetrievalResponse {
            results,
            mode: SearchMode::Hybrid,
            confidence: Confidence::from_top_similarity(top_similarity),
            metrics: RetrievalMetrics {
                embed_ms,
                retrieval_ms,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingTextEmbedder;
    use crate::metadata::InMemoryTitleProvider;
    use crate::storage::MemoryStorage;

    const DIM: usize = 64;

    /// Embedder that always fails, for degraded-path tests.
    #[derive(Debug)]
    struct FailingEmbedder(usize);

    impl TextEmbedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vector> {
            Err(FathomError::embedding("model unreachable"))
        }

        fn dimension(&self) -> usize {
            self.0
        }
    }

    fn test_config() -> RetrievalConfig {
        RetrievalConfig {
            dimension: DIM,
            ..Default::default()
        }
    }

    fn corpus() -> Vec<(Fid, String)> {
        vec![
            (0, "the quick brown fox jumps over the lazy dog".to_string()),
            (1, "python is a versatile programming language".to_string()),
            (2, "reciprocal rank fusion merges ranked lists".to_string()),
        ]
    }

    fn build_engine(embedder: Arc<dyn TextEmbedder>) -> RetrievalEngine {
        let titles = Arc::new(InMemoryTitleProvider::from_pairs([
            (0u64, "Animal Stories"),
            (1u64, "Python Handbook"),
            (2u64, "Search Fusion Notes"),
        ]));
        let engine = RetrievalEngine::new(
            test_config(),
            embedder,
            titles,
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();

        let hasher = HashingTextEmbedder::new(DIM);
        let vectors: Vec<Vector> = corpus()
            .iter()
            .map(|(_, text)| hasher.embed(text).unwrap())
            .collect();
        engine.add_vectors(vectors).unwrap();
        engine.rebuild_lexical(&corpus());
        engine
    }

    #[test]
    fn test_parse_lossy_modes() {
        assert_eq!(SearchMode::parse_lossy("vector"), SearchMode::Vector);
        assert_eq!(SearchMode::parse_lossy("lexical"), SearchMode::Lexical);
        assert_eq!(SearchMode::parse_lossy("bm25"), SearchMode::Lexical);
        assert_eq!(SearchMode::parse_lossy("hybrid"), SearchMode::Hybrid);
        assert_eq!(SearchMode::parse_lossy("HYBRID"), SearchMode::Hybrid);
        // Unrecognized values degrade to hybrid, never error.
        assert_eq!(SearchMode::parse_lossy("invalid_mode"), SearchMode::Hybrid);
        assert_eq!(SearchMode::parse_lossy(""), SearchMode::Hybrid);
        assert_eq!(SearchMode::default(), SearchMode::Hybrid);
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(Confidence::from_top_similarity(Some(0.85)), Confidence::High);
        assert_eq!(Confidence::from_top_similarity(Some(0.7)), Confidence::Medium);
        assert_eq!(Confidence::from_top_similarity(Some(0.3)), Confidence::Low);
        assert_eq!(Confidence::from_top_similarity(None), Confidence::Low);
    }

    #[test]
    fn test_dimension_mismatch_on_construction() {
        let result = RetrievalEngine::new(
            test_config(),
            Arc::new(HashingTextEmbedder::new(DIM + 1)),
            Arc::new(InMemoryTitleProvider::new()),
            Arc::new(MemoryStorage::new()),
        );
        assert!(matches!(result, Err(FathomError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_vector_mode() {
        let engine = build_engine(Arc::new(HashingTextEmbedder::new(DIM)));
        let response = engine
            .retrieve("python programming language", 2, SearchMode::Vector)
            .unwrap();

        assert_eq!(response.mode, SearchMode::Vector);
        assert!(!response.results.is_empty());
        assert_eq!(response.results[0].fid, 1);
    }

    #[test]
    fn test_lexical_mode_has_zero_embed_time() {
        let engine = build_engine(Arc::new(HashingTextEmbedder::new(DIM)));
        let response = engine
            .retrieve("python", 5, SearchMode::Lexical)
            .unwrap();

        assert_eq!(response.mode, SearchMode::Lexical);
        assert_eq!(response.metrics.embed_ms, 0);
        assert_eq!(response.results[0].fid, 1);
        assert_eq!(response.confidence, Confidence::Low);
    }

    #[test]
    fn test_hybrid_mode_fuses_and_boosts() {
        let engine = build_engine(Arc::new(HashingTextEmbedder::new(DIM)));
        let response = engine
            .retrieve("python programming", 3, SearchMode::Hybrid)
            .unwrap();

        assert_eq!(response.mode, SearchMode::Hybrid);
        assert!(!response.results.is_empty());
        // Strong on both paths, plus "python" matches its title.
        assert_eq!(response.results[0].fid, 1);
        for pair in response.results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_hybrid_degrades_when_embedding_fails() {
        let titles = Arc::new(InMemoryTitleProvider::new());
        let engine = RetrievalEngine::new(
            test_config(),
            Arc::new(FailingEmbedder(DIM)),
            titles,
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();
        engine.rebuild_lexical(&corpus());

        let response = engine
            .retrieve("python", 5, SearchMode::Hybrid)
            .unwrap();
        assert_eq!(response.results[0].fid, 1);
        assert_eq!(response.confidence, Confidence::Low);
    }

    #[test]
    fn test_vector_mode_propagates_embedding_failure() {
        let engine = RetrievalEngine::new(
            test_config(),
            Arc::new(FailingEmbedder(DIM)),
            Arc::new(InMemoryTitleProvider::new()),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();

        let result = engine.retrieve("anything", 5, SearchMode::Vector);
        assert!(matches!(result, Err(FathomError::Embedding(_))));
    }

    #[test]
    fn test_hybrid_total_failure_is_index_unavailable() {
        let engine = RetrievalEngine::new(
            test_config(),
            Arc::new(FailingEmbedder(DIM)),
            Arc::new(InMemoryTitleProvider::new()),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();

        // Vectors exist but the embedder cannot reach them, and the
        // lexical index was never built.
        let hasher = HashingTextEmbedder::new(DIM);
        engine
            .add_vectors(vec![hasher.embed("some fragment").unwrap()])
            .unwrap();

        let result = engine.retrieve("query", 5, SearchMode::Hybrid);
        assert!(matches!(result, Err(FathomError::IndexUnavailable)));
    }

    #[test]
    fn test_empty_engine_returns_empty_results() {
        let engine = RetrievalEngine::new(
            test_config(),
            Arc::new(HashingTextEmbedder::new(DIM)),
            Arc::new(InMemoryTitleProvider::new()),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();

        for mode in [SearchMode::Vector, SearchMode::Lexical, SearchMode::Hybrid] {
            let response = engine.retrieve("anything", 5, mode).unwrap();
            assert!(response.results.is_empty());
        }
    }

    #[test]
    fn test_persist_open_roundtrip_is_bit_identical() {
        let storage = Arc::new(MemoryStorage::new());
        let embedder: Arc<dyn TextEmbedder> = Arc::new(HashingTextEmbedder::new(DIM));
        let titles = Arc::new(InMemoryTitleProvider::new());

        let engine = RetrievalEngine::new(
            test_config(),
            Arc::clone(&embedder),
            Arc::clone(&titles) as Arc<dyn TitleProvider>,
            Arc::clone(&storage) as Arc<dyn Storage>,
        )
        .unwrap();
        let hasher = HashingTextEmbedder::new(DIM);
        let vectors: Vec<Vector> = corpus()
            .iter()
            .map(|(_, text)| hasher.embed(text).unwrap())
            .collect();
        engine.add_vectors(vectors).unwrap();
        engine.rebuild_lexical(&corpus());
        engine.persist_all().unwrap();

        let reopened = RetrievalEngine::open(test_config(), embedder, titles, storage).unwrap();
        assert_eq!(reopened.vector_count(), 3);
        assert_eq!(reopened.lexical_count(), 3);

        for mode in [SearchMode::Vector, SearchMode::Lexical, SearchMode::Hybrid] {
            let before = engine.retrieve("quick brown fox", 3, mode).unwrap();
            let after = reopened.retrieve("quick brown fox", 3, mode).unwrap();
            assert_eq!(before.results, after.results);
        }
    }

    #[test]
    fn test_open_without_snapshots_starts_empty() {
        let engine = RetrievalEngine::open(
            test_config(),
            Arc::new(HashingTextEmbedder::new(DIM)),
            Arc::new(InMemoryTitleProvider::new()),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();
        assert_eq!(engine.vector_count(), 0);
        assert_eq!(engine.lexical_count(), 0);
    }

    #[test]
    fn test_open_surfaces_corrupt_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .write(&test_config().vector_snapshot, b"not a snapshot at all")
            .unwrap();

        let result = RetrievalEngine::open(
            test_config(),
            Arc::new(HashingTextEmbedder::new(DIM)),
            Arc::new(InMemoryTitleProvider::new()),
            storage,
        );
        assert!(matches!(result, Err(FathomError::CorruptSnapshot(_))));
    }

    #[test]
    fn test_concurrent_reads_during_rebuild() {
        let engine = Arc::new(build_engine(Arc::new(HashingTextEmbedder::new(DIM))));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    for _ in 0..50 {
                        let response = engine
                            .retrieve("ranked fusion lists", 3, SearchMode::Hybrid)
                            .unwrap();
                        // Reads see a consistent snapshot: either the
                        // original three-fragment corpus or a rebuilt one.
                        assert!(response.results.len() <= 3);
                    }
                });
            }

            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..20 {
                    engine.rebuild_lexical(&corpus());
                }
            });
        });
    }
}
