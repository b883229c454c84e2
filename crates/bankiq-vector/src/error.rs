//! Error types for bankiq-vector.

use thiserror::Error;

/// Result type for bankiq-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bankiq-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Dimension mismatch between a vector and the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality established by the index.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The vectors and payloads handed to `insert` are not parallel.
    #[error("Length mismatch: {vectors} vectors but {payloads} payload entries")]
    LengthMismatch {
        /// Number of vectors supplied.
        vectors: usize,
        /// Number of payload entries supplied.
        payloads: usize,
    },

    /// Invalid vector (empty, non-finite, or not unit length when required).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Inserting would exceed the configured maximum number of vectors.
    #[error("Capacity exceeded: index holds {current}, batch adds {adding}, limit is {limit}")]
    CapacityExceeded {
        /// Entries already stored.
        current: usize,
        /// Entries in the rejected batch.
        adding: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A snapshot failed validation or could not be decoded.
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    /// No snapshot exists at the requested location.
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    /// Encoding a snapshot failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
