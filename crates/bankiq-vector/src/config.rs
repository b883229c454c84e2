//! Configuration for bankiq-vector.

use crate::distance::DistanceMetric;
use serde::{Deserialize, Serialize};

/// Configuration for a [`VectorIndex`](crate::VectorIndex).
///
/// The configuration is stored inside snapshots, so a loaded index
/// enforces the same rules it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Similarity metric used for ranking.
    pub metric: DistanceMetric,

    /// Fixed dimensionality. If None, the first insertion decides.
    pub dimensions: Option<usize>,

    /// Maximum number of vectors (0 = unlimited).
    pub max_vectors: usize,

    /// Reject vectors that are not unit length.
    ///
    /// Inner-product ranking is only meaningful over normalized vectors,
    /// so this defaults to true.
    pub require_normalized: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::DotProduct,
            dimensions: None,
            max_vectors: 0,
            require_normalized: true,
        }
    }
}

impl IndexConfig {
    /// Create the default configuration (inner product, normalized input).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Pin the dimensionality up front.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Set the maximum number of vectors.
    pub fn with_max_vectors(mut self, max: usize) -> Self {
        self.max_vectors = max;
        self
    }

    /// Enable or disable the unit-length check on insertion.
    pub fn with_require_normalized(mut self, required: bool) -> Self {
        self.require_normalized = required;
        self
    }
}
