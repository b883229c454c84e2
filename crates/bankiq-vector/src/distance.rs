//! Similarity metrics and vector helpers.
//!
//! The index ranks by inner product. Embeddings are expected to be
//! L2-normalized before they reach the index, which makes the inner
//! product equal to cosine similarity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when checking that a vector has unit length.
pub const NORM_TOLERANCE: f32 = 1e-3;

/// Similarity metric for ranking.
///
/// Scores are always "higher is more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Inner product.
    ///
    /// Equivalent to cosine similarity for unit vectors.
    /// Range for unit vectors: [-1, 1].
    #[default]
    DotProduct,

    /// Cosine similarity, normalizing both sides on the fly.
    ///
    /// Use when inputs cannot be guaranteed to be pre-normalized.
    Cosine,
}

impl DistanceMetric {
    /// Compute the similarity score between two vectors.
    ///
    /// # Panics
    ///
    /// Debug builds assert that the vectors have equal length.
    #[inline]
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::DotProduct => dot_product(a, b),
            DistanceMetric::Cosine => cosine_similarity(a, b),
        }
    }

    /// Get the name of this metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" | "dot_product" | "dotproduct" | "inner" | "inner_product" | "ip" => {
                Ok(DistanceMetric::DotProduct)
            }
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

// ============================================================================
// Vector Functions
// ============================================================================

/// Compute the dot product between two vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;

    // Manual loop unrolling for better performance
    let chunks = a.len() / 4;
    let remainder = a.len() % 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];
    }

    let start = chunks * 4;
    for i in 0..remainder {
        let idx = start + i;
        sum += a[idx] * b[idx];
    }

    sum
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero length.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 {
        0.0
    } else {
        dot_product(a, b) / denom
    }
}

/// Euclidean length of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    norm_f64(v) as f32
}

/// Accumulates in f64 so finite f32 input cannot overflow or underflow
/// the sum of squares.
fn norm_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Scale a vector to unit length in place.
///
/// Returns `false` (leaving the vector untouched) when the norm is zero
/// or not finite.
pub fn normalize(v: &mut [f32]) -> bool {
    let norm = norm_f64(v);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

/// Whether a vector has unit length within [`NORM_TOLERANCE`].
pub fn is_normalized(v: &[f32]) -> bool {
    if v.is_empty() {
        return false;
    }
    (norm_f64(v) - 1.0).abs() <= f64::from(NORM_TOLERANCE)
}

// ============================================================================
// Tests
// ============================================================================
