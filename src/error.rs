//! Error types for the Fathom library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`FathomError`] enum. Variants map to the failure classes a retrieval
//! call can hit: bad vector dimensions, unavailable indexes, corrupt
//! snapshots, upstream embedding failures, and storage/IO plumbing.

use std::io;

use thiserror::Error;

/// The main error type for Fathom operations.
#[derive(Error, Debug)]
pub enum FathomError {
    /// A vector's width does not match the index's configured dimension.
    ///
    /// Fatal to the call that supplied the vector; the index is left
    /// unchanged.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the index was configured with.
        expected: usize,
        /// The dimension actually supplied.
        actual: usize,
    },

    /// Every retrieval path failed, leaving no index able to answer.
    ///
    /// Plain searches against an empty or unbuilt index return empty
    /// results instead of this error; this is reserved for hybrid
    /// retrieval where both the vector and lexical paths errored.
    #[error("no retrieval path available")]
    IndexUnavailable,

    /// A persisted snapshot exists but could not be decoded.
    ///
    /// Surfaced to the caller so process startup can decide between
    /// starting empty and aborting.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// The embedding collaborator failed.
    ///
    /// Propagated unchanged; retrieval is latency-sensitive, so retry
    /// policy belongs to a higher layer.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Storage backend errors.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid operation or argument.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with [`FathomError`].
pub type Result<T> = std::result::Result<T, FathomError>;

impl FathomError {
    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        FathomError::DimensionMismatch { expected, actual }
    }

    /// Create a new corrupt snapshot error.
    pub fn corrupt_snapshot<S: Into<String>>(msg: S) -> Self {
        FathomError::CorruptSnapshot(msg.into())
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        FathomError::Embedding(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        FathomError::Storage(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        FathomError::InvalidOperation(msg.into())
    }
}
