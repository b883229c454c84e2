//! Common types for bankiq-vector.

use crate::distance::DistanceMetric;
use serde::{Deserialize, Serialize};

/// Identifier of an entry: its position in insertion order.
pub type EntryId = usize;

/// One ranked match from a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Insertion-order id of the matched entry.
    pub id: EntryId,
    /// Similarity score (higher = more similar).
    pub score: f32,
}

impl SearchHit {
    /// Create a new search hit.
    pub fn new(id: EntryId, score: f32) -> Self {
        Self { id, score }
    }
}

/// Statistics about an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of stored entries.
    pub entries: usize,
    /// Established dimensionality, if any vector has been inserted.
    pub dimensions: Option<usize>,
    /// Metric used for ranking.
    pub metric: DistanceMetric,
    /// Bytes held by the raw vector storage.
    pub vector_bytes: usize,
}
