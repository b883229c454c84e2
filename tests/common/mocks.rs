//! Mock implementations for testing.
//!
//! Deterministic embedding providers and snapshot stores shared across the
//! integration tests, so no test needs a live embedding server.

use async_trait::async_trait;
use bankiq::rag::embeddings::EmbeddingProvider;
use bankiq::rag::snapshot::SnapshotStore;
use bankiq::types::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Embeds text as keyword counts over a fixed vocabulary.
///
/// One dimension per keyword plus a small constant bias dimension, so no
/// text ever maps to the zero vector.
///
/// # Examples
///
/// ```ignore
/// let embedder = MockKeywordEmbedder::new(&["capital", "liquidity"]);
/// // "capital capital" -> [2.0, 0.0, 0.05]
/// ```
#[derive(Clone)]
pub struct MockKeywordEmbedder {
    vocabulary: Vec<String>,
}

impl MockKeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }
}

#[async_trait]
impl EmbeddingProvider for MockKeywordEmbedder {
    fn name(&self) -> &str {
        "mock-keyword"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|word| lower.matches(word.as_str()).count() as f32)
            .collect();
        vector.push(0.05);
        Ok(vector)
    }
}

/// Provider that always fails.
pub struct MockFailingEmbedder;

#[async_trait]
impl EmbeddingProvider for MockFailingEmbedder {
    fn name(&self) -> &str {
        "mock-failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::Embedding("Mock embedding failure".to_string()))
    }
}

/// Wraps a provider, counting calls and optionally failing after a
/// number of successful ones.
pub struct MockCountingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl MockCountingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Succeed `n` times, then fail every call
    pub fn failing_after(inner: Arc<dyn EmbeddingProvider>, n: usize) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail_after: Some(n),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockCountingEmbedder {
    fn name(&self) -> &str {
        "mock-counting"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if previous >= limit {
                return Err(AppError::Embedding(format!(
                    "Mock failure after {} calls",
                    limit
                )));
            }
        }
        self.inner.embed(text).await
    }
}

/// Snapshot store whose writes always fail and which never holds data.
pub struct MockReadOnlySnapshotStore;

#[async_trait]
impl SnapshotStore for MockReadOnlySnapshotStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn write(&self, _bytes: &[u8]) -> Result<()> {
        Err(AppError::Internal("Mock read-only store".to_string()))
    }

    fn describe(&self) -> String {
        "mock-read-only".to_string()
    }
}
