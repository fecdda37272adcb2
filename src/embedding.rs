//! Text embedding support.
//!
//! The engine does not run embedding models itself. [`TextEmbedder`] is the
//! seam to the external embedding collaborator: any implementation that
//! produces unit-normalized vectors of the configured dimension can drive
//! vector and hybrid retrieval. Implementations must be deterministic for
//! identical input; a query-instruction prefix, if any, is applied inside
//! the implementation.
//!
//! [`HashingTextEmbedder`] is a dependency-free implementation used by the
//! CLI and tests: it hashes tokens into fixed buckets and normalizes the
//! result. It captures lexical overlap, not semantics, which is enough to
//! exercise every retrieval path deterministically.

use std::hash::{BuildHasher, Hasher};

use crate::analysis::{CodeTokenizer, Tokenizer};
use crate::error::Result;
use crate::vector::Vector;

/// Trait for converting text to embedding vectors.
///
/// Implementations are blocking; any timeout or retry policy is owned by
/// the implementation, not by the retrieval engine.
pub trait TextEmbedder: Send + Sync {
    /// Embed the given text into a unit-normalized vector.
    fn embed(&self, text: &str) -> Result<Vector>;

    /// The dimension of vectors this embedder produces.
    fn dimension(&self) -> usize;
}

/// Fixed seeds so the hashed projection is identical across processes.
const HASH_SEEDS: (u64, u64, u64, u64) = (0x9e37, 0x79b9, 0x7f4a, 0x7c15);

/// Deterministic hashed bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashingTextEmbedder {
    dimension: usize,
    tokenizer: CodeTokenizer,
    hasher: ahash::RandomState,
}

impl HashingTextEmbedder {
    /// Create a new hashing embedder with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            tokenizer: CodeTokenizer::new(),
            hasher: ahash::RandomState::with_seeds(
                HASH_SEEDS.0,
                HASH_SEEDS.1,
                HASH_SEEDS.2,
                HASH_SEEDS.3,
            ),
        }
    }

    fn bucket_and_sign(&self, token: &str) -> (usize, f32) {
        let mut hasher = self.hasher.build_hasher();
        hasher.write(token.as_bytes());
        let hash = hasher.finish();
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl TextEmbedder for HashingTextEmbedder {
    fn embed(&self, text: &str) -> Result<Vector> {
        let mut data = vec![0.0f32; self.dimension];
        for token in self.tokenizer.tokenize(text) {
            let (bucket, sign) = self.bucket_and_sign(&token);
            data[bucket] += sign;
        }
        let mut vector = Vector::new(data);
        vector.normalize();
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
