//! Flat vector index.
//!
//! Stores vectors contiguously alongside one payload per vector and answers
//! exact nearest-neighbor queries by scanning every entry. Entries are
//! append-only and addressed by insertion order.

use crate::config::IndexConfig;
use crate::distance::{is_normalized, DistanceMetric};
use crate::error::{Error, Result};
use crate::types::{EntryId, IndexStats, SearchHit};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, trace};

/// Thread-safe, append-only vector index with a parallel payload array.
///
/// Readers may search concurrently; insertion takes the write lock and
/// validates the whole batch before anything is appended, so a rejected
/// batch leaves the index unchanged.
pub struct VectorIndex<M> {
    config: IndexConfig,
    pub(crate) inner: RwLock<IndexData<M>>,
}

/// Storage behind the lock.
///
/// Invariant: `vectors.len() == dimensions * payloads.len()`.
pub(crate) struct IndexData<M> {
    pub(crate) dimensions: Option<usize>,
    pub(crate) vectors: Vec<f32>,
    pub(crate) payloads: Vec<M>,
}

impl<M> VectorIndex<M> {
    /// Create an empty index.
    pub fn new(config: IndexConfig) -> Self {
        let dimensions = config.dimensions;
        Self {
            config,
            inner: RwLock::new(IndexData {
                dimensions,
                vectors: Vec::new(),
                payloads: Vec::new(),
            }),
        }
    }

    pub(crate) fn from_parts(config: IndexConfig, data: IndexData<M>) -> Self {
        Self {
            config,
            inner: RwLock::new(data),
        }
    }

    /// Get the index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Get the similarity metric.
    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// Get the established dimensionality, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.inner.read().dimensions
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().payloads.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors with their payloads.
    ///
    /// `vectors[i]` is paired with `payloads[i]`. Returns the range of ids
    /// assigned to the batch.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if the two lists differ in length.
    /// - [`Error::DimensionMismatch`] if a vector disagrees with the index
    ///   dimensionality (fixed by configuration or by the first insertion).
    /// - [`Error::InvalidVector`] for empty or non-finite vectors, or
    ///   non-unit vectors when `require_normalized` is set.
    /// - [`Error::CapacityExceeded`] if `max_vectors` would be exceeded.
    ///
    /// On any error nothing is inserted.
    pub fn insert(&self, vectors: Vec<Vec<f32>>, payloads: Vec<M>) -> Result<Range<EntryId>> {
        if vectors.len() != payloads.len() {
            return Err(Error::LengthMismatch {
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }

        let mut data = self.inner.write();
        let start = data.payloads.len();

        if vectors.is_empty() {
            return Ok(start..start);
        }

        let dimensions = match data.dimensions {
            Some(d) => d,
            None => vectors[0].len(),
        };
        if dimensions == 0 {
            return Err(Error::InvalidVector("Vector is empty".to_string()));
        }

        for (offset, vector) in vectors.iter().enumerate() {
            self.validate(vector, dimensions, start + offset)?;
        }

        if self.config.max_vectors > 0 && start + vectors.len() > self.config.max_vectors {
            return Err(Error::CapacityExceeded {
                current: start,
                adding: vectors.len(),
                limit: self.config.max_vectors,
            });
        }

        let count = vectors.len();
        data.dimensions = Some(dimensions);
        data.vectors.reserve(count * dimensions);
        for vector in vectors {
            data.vectors.extend_from_slice(&vector);
        }
        data.payloads.extend(payloads);

        debug!(count, total = data.payloads.len(), "Inserted vectors");
        Ok(start..start + count)
    }

    /// Search for the `k` entries most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores keep
    /// insertion order. An empty index or `k == 0` yields no results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let data = self.inner.read();
        self.rank(&data, query, k)
    }

    /// Search and return each hit together with a clone of its payload.
    ///
    /// Hits and payloads are read under a single lock acquisition.
    pub fn search_with_payloads(&self, query: &[f32], k: usize) -> Result<Vec<(SearchHit, M)>>
    where
        M: Clone,
    {
        let data = self.inner.read();
        let hits = self.rank(&data, query, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| (hit, data.payloads[hit.id].clone()))
            .collect())
    }

    /// Get a vector and its payload by id.
    pub fn get(&self, id: EntryId) -> Option<(Vec<f32>, M)>
    where
        M: Clone,
    {
        let data = self.inner.read();
        let payload = data.payloads.get(id)?.clone();
        let dimensions = data.dimensions?;
        let vector = data.vectors[id * dimensions..(id + 1) * dimensions].to_vec();
        Some((vector, payload))
    }

    /// Get a payload by id.
    pub fn payload(&self, id: EntryId) -> Option<M>
    where
        M: Clone,
    {
        self.inner.read().payloads.get(id).cloned()
    }

    /// Get index statistics.
    pub fn stats(&self) -> IndexStats {
        let data = self.inner.read();
        IndexStats {
            entries: data.payloads.len(),
            dimensions: data.dimensions,
            metric: self.config.metric,
            vector_bytes: data.vectors.len() * std::mem::size_of::<f32>(),
        }
    }

    fn validate(&self, vector: &[f32], dimensions: usize, position: usize) -> Result<()> {
        if vector.len() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(format!(
                "Vector at position {} contains NaN or Inf",
                position
            )));
        }

        if self.config.require_normalized && !is_normalized(vector) {
            return Err(Error::InvalidVector(format!(
                "Vector at position {} is not unit length",
                position
            )));
        }

        Ok(())
    }

    fn rank(&self, data: &IndexData<M>, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dimensions) = data.dimensions else {
            return Ok(Vec::new());
        };
        if k == 0 || data.payloads.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "Query contains NaN or Inf".to_string(),
            ));
        }

        let metric = self.config.metric;
        let mut hits: Vec<SearchHit> = data
            .vectors
            .chunks_exact(dimensions)
            .enumerate()
            .map(|(id, vector)| SearchHit::new(id, metric.similarity(query, vector)))
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank_order);
            hits.truncate(k);
        }
        hits.sort_by(rank_order);

        trace!(k, returned = hits.len(), "Ranked entries");
        Ok(hits)
    }
}

/// Descending score, then ascending id. Total, so ranking is deterministic.
fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}
