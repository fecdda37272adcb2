//! Flat vector index for exact inner-product search.
//!
//! The index owns a growable set of fixed-dimension, unit-normalized
//! vectors and answers queries by a brute-force linear scan. With
//! normalized inputs the inner product equals cosine similarity, so one
//! code path covers both. Exact search is O(size × D) per query, which is
//! the right trade for a bounded corpus: correct by construction, no
//! recall tuning.
//!
//! Fragment identifiers are assigned contiguously at insertion time and
//! never reused; the index is append-only.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FathomError, Result};
use crate::storage::{self, Storage};
use crate::types::{Fid, ScoredFragment, sort_by_score_desc};
use crate::vector::Vector;

/// Vector count above which the linear scan runs on the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// Append-only exact-search vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatVectorIndex {
    dimension: usize,
    vectors: Vec<Vector>,
    next_fid: Fid,
}

impl FlatVectorIndex {
    /// Create a new empty index with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            next_fid: 0,
        }
    }

    /// The configured vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors held.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The fid the next added vector will receive.
    pub fn next_fid(&self) -> Fid {
        self.next_fid
    }

    /// Append a batch of vectors, returning the fids assigned to them.
    ///
    /// Fids are contiguous starting from [`next_fid`](Self::next_fid).
    /// Every vector must match the configured dimension; a mismatch fails
    /// the whole call and leaves the index unchanged. Callers guarantee
    /// the vectors are already unit-normalized.
    pub fn add(&mut self, vectors: Vec<Vector>) -> Result<Vec<Fid>> {
        for vector in &vectors {
            vector.validate_dimension(self.dimension)?;
            if !vector.is_valid() {
                return Err(FathomError::invalid_operation(
                    "vector contains NaN or infinite values",
                ));
            }
        }

        let assigned: Vec<Fid> = (self.next_fid..self.next_fid + vectors.len() as Fid).collect();
        self.next_fid += vectors.len() as Fid;
        self.vectors.extend(vectors);

        debug!(added = assigned.len(), total = self.len(), "vectors appended");
        Ok(assigned)
    }

    /// Exact search for the `k` nearest vectors by inner product.
    ///
    /// Returns up to `k` hits in descending score order. An index holding
    /// fewer than `k` vectors returns all of them; an empty index returns
    /// an empty list, never an error.
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<ScoredFragment>> {
        query.validate_dimension(self.dimension)?;

        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ScoredFragment> = if self.vectors.len() > PARALLEL_SCAN_THRESHOLD {
            self.vectors
                .par_iter()
                .enumerate()
                .map(|(i, v)| ScoredFragment::new(i as Fid, query.dot(v)))
                .collect()
        } else {
            self.vectors
                .iter()
                .enumerate()
                .map(|(i, v)| ScoredFragment::new(i as Fid, query.dot(v)))
                .collect()
        };

        sort_by_score_desc(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    /// Persist the full vector set and fid counter as a snapshot.
    ///
    /// Persisting an empty index is a no-op: an unloaded index restarting
    /// on an unintended shutdown path must not clobber durable history.
    pub fn persist(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        if self.is_empty() {
            info!(snapshot = name, "vector index empty, skipping persist");
            return Ok(());
        }
        storage::write_snapshot(storage, name, self)?;
        info!(snapshot = name, vectors = self.len(), "vector index persisted");
        Ok(())
    }

    /// Restore an index from a snapshot, if one exists.
    ///
    /// Returns `Ok(None)` when no snapshot is stored under `name`. A
    /// snapshot whose dimension disagrees with `dimension` fails with
    /// [`FathomError::DimensionMismatch`].
    pub fn restore(storage: &dyn Storage, dimension: usize, name: &str) -> Result<Option<Self>> {
        let Some(index) = storage::read_snapshot::<Self>(storage, name)? else {
            return Ok(None);
        };
        if index.dimension != dimension {
            return Err(FathomError::dimension_mismatch(dimension, index.dimension));
        }
        info!(snapshot = name, vectors = index.len(), "vector index restored");
        Ok(Some(index))
    }
}
