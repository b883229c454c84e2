//! Text embedding over HTTP providers.
//!
//! [`EmbeddingProvider`] is the raw model call. [`EmbeddingService`] wraps a
//! provider and guarantees what the index needs: one vector per input,
//! consistent dimensionality, finite values, unit length.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{EmbeddingConfig, EmbeddingProviderKind};
use async_trait::async_trait;
use bankiq_vector::distance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A remote (or local) embedding model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs and errors
    fn name(&self) -> &str;

    /// Embed one text. The returned vector need not be normalized.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============= Ollama =============

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama `/api/embed` client
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("ollama request failed: {}", e)))?;

        let body: OllamaEmbedResponse = read_json(self.name(), response).await?;
        body.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("ollama returned no embeddings".to_string()))
    }
}

// ============= OpenAI-compatible =============

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

/// Client for `POST {api_base}/embeddings`.
///
/// Works with OpenAI itself and with compatible gateways, including those
/// that front Titan Text Embeddings V2.
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbeddings {
    pub fn new(api_base: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions: None,
        })
    }

    /// Ask the model for a specific output size
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.api_base);
        let request = OpenAiEmbedRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("openai request failed: {}", e)))?;

        let body: OpenAiEmbedResponse = read_json(self.name(), response).await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("openai returned no embeddings".to_string()))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Embedding(format!(
            "{} returned {}: {}",
            provider, status, body
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::Embedding(format!("{} response malformed: {}", provider, e)))
}

// ============= Service =============

/// Produces normalized embeddings suitable for inner-product search.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    max_input_chars: usize,
    dimensions: Option<usize>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            max_input_chars: 8000,
            dimensions: None,
        }
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Require every embedding to have exactly `dimensions` components
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Build the configured provider, resolving its API key from the environment.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            EmbeddingProviderKind::Ollama => {
                Arc::new(OllamaEmbeddings::new(&config.base_url, &config.model, timeout)?)
            }
            EmbeddingProviderKind::OpenAI => {
                let api_key = config.api_key()?.ok_or_else(|| {
                    AppError::Configuration(
                        "embedding.api_key_env is required for the openai provider".to_string(),
                    )
                })?;
                let mut client =
                    OpenAiEmbeddings::new(&config.api_base, &api_key, &config.model, timeout)?;
                if let Some(dimensions) = config.dimensions {
                    client = client.with_dimensions(dimensions);
                }
                Arc::new(client)
            }
        };

        let mut service = Self::new(provider).with_max_input_chars(config.max_input_chars);
        if let Some(dimensions) = config.dimensions {
            service = service.with_dimensions(dimensions);
        }
        Ok(service)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Configured dimensionality, if pinned
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Embed a single query string
    #[instrument(skip(self, text), fields(provider = self.provider.name(), chars = text.len()))]
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let raw = self.provider.embed(truncate(text, self.max_input_chars)).await?;
        self.finish(raw)
    }

    /// Embed texts in order, one provider call each.
    ///
    /// Fails as a whole if any single text fails; no partial output is
    /// returned. All vectors share one dimensionality.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for text in texts {
            let raw = self.provider.embed(truncate(text, self.max_input_chars)).await?;
            let vector = self.finish(raw)?;

            if let Some(first) = vectors.first() {
                if first.len() != vector.len() {
                    return Err(AppError::DimensionMismatch {
                        expected: first.len(),
                        actual: vector.len(),
                    });
                }
            }
            vectors.push(vector);
        }

        debug!(count = vectors.len(), "Embedded batch");
        Ok(vectors)
    }

    fn finish(&self, mut vector: Vec<f32>) -> Result<Vec<f32>> {
        if vector.is_empty() {
            return Err(AppError::Embedding(format!(
                "{} returned an empty vector",
                self.provider.name()
            )));
        }

        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Embedding(format!(
                "{} returned non-finite values",
                self.provider.name()
            )));
        }

        if !distance::normalize(&mut vector) {
            return Err(AppError::Embedding(format!(
                "{} returned a zero vector",
                self.provider.name()
            )));
        }

        Ok(vector)
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
