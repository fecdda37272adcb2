//! # Fathom
//!
//! A hybrid retrieval engine for grounding answer generation: exact
//! in-memory vector search and Okapi BM25 lexical search over the same
//! fragment corpus, merged with reciprocal rank fusion and a title-match
//! boost into a single relevance-ordered result list.
//!
//! ## Features
//!
//! - Append-only flat vector index, exact inner-product search
//! - One-pass BM25 index with a code-aware tokenizer
//! - Reciprocal rank fusion (κ = 60) with post-fusion title boosting
//! - Vector / lexical / hybrid search modes with graceful degradation
//! - Checksummed snapshot persistence over pluggable storage backends
//! - Per-call embedding and retrieval latency in whole milliseconds
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use fathom::config::RetrievalConfig;
//! use fathom::embedding::{HashingTextEmbedder, TextEmbedder};
//! use fathom::metadata::InMemoryTitleProvider;
//! use fathom::retrieval::{RetrievalEngine, SearchMode};
//! use fathom::storage::MemoryStorage;
//!
//! # fn main() -> fathom::error::Result<()> {
//! let config = RetrievalConfig {
//!     dimension: 64,
//!     ..Default::default()
//! };
//! let embedder = Arc::new(HashingTextEmbedder::new(64));
//! let engine = RetrievalEngine::new(
//!     config,
//!     embedder.clone(),
//!     Arc::new(InMemoryTitleProvider::from_pairs([(0u64, "Fusion Notes")])),
//!     Arc::new(MemoryStorage::new()),
//! )?;
//!
//! engine.add_vectors(vec![embedder.embed("reciprocal rank fusion")?])?;
//! engine.rebuild_lexical(&[(0, "reciprocal rank fusion".to_string())]);
//!
//! let response = engine.retrieve("rank fusion", 5, SearchMode::Hybrid)?;
//! assert_eq!(response.results[0].fid, 0);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod lexical_index;
pub mod metadata;
pub mod retrieval;
pub mod storage;
pub mod types;
pub mod vector;
pub mod vector_index;

pub mod prelude {
    //! Convenience re-exports for common usage.
    pub use crate::config::RetrievalConfig;
    pub use crate::error::{FathomError, Result};
    pub use crate::retrieval::{RetrievalEngine, RetrievalResponse, SearchMode};
    pub use crate::types::{Fid, ScoredFragment};
    pub use crate::vector::Vector;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
