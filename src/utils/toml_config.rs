//! TOML-based configuration for BankIQ
//!
//! Declarative configuration for the embedding provider, the filing source,
//! the index snapshot, chunking, and retrieval via a TOML file
//! (`bankiq.toml`). Every field has a default, so an empty file is a valid
//! configuration pointing at a local Ollama server.
//!
//! Secrets are never stored in the file. Sections reference them by
//! environment variable name (e.g. `api_key_env`) and they are resolved
//! when the provider is built.

use bankiq_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "bankiq.toml";

/// Root configuration structure loaded from bankiq.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankIqConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub index: IndexSection,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Embedding Configuration =============

/// Which embedding backend to call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local Ollama server (`/api/embed`)
    #[default]
    Ollama,
    /// OpenAI or any OpenAI-compatible gateway (`/embeddings`)
    OpenAI,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Ollama server URL
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// OpenAI-compatible API base
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// Environment variable containing the API key (OpenAI provider)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Expected output dimensionality. Checked on every embedding and
    /// forwarded to providers that accept it.
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Inputs are truncated to this many characters before embedding
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_input_chars() -> usize {
    8000
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            base_url: default_ollama_url(),
            api_base: default_openai_base(),
            api_key_env: None,
            dimensions: None,
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from the environment, if one is configured.
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        match self.api_key_env {
            Some(ref name) => std::env::var(name)
                .map(Some)
                .map_err(|_| ConfigError::MissingEnvVar(name.clone())),
            None => Ok(None),
        }
    }
}

// ============= Source Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the `<bank>/<year>/<filing_type>/` tree
    #[serde(default = "default_source_root")]
    pub root: PathBuf,

    /// Filing years below this are not indexed
    #[serde(default = "default_min_year")]
    pub min_year: u32,

    /// File extension of filing text files
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./data/sec_filings")
}

fn default_min_year() -> u32 {
    2023
}

fn default_extension() -> String {
    "txt".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_source_root(),
            min_year: default_min_year(),
            extension: default_extension(),
        }
    }
}

// ============= Index Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSection {
    /// Snapshot file. Unset disables persistence.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default)]
    pub metric: DistanceMetric,

    #[serde(default = "default_true")]
    pub require_normalized: bool,
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("./data/sec_filings_index.bqvx"))
}

fn default_true() -> bool {
    true
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            metric: DistanceMetric::default(),
            require_normalized: true,
        }
    }
}

// ============= Chunking Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Documents shorter than this are skipped
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    #[serde(default = "default_boundary_ratio")]
    pub boundary_ratio: f64,
}

fn default_chunk_size() -> usize {
    4000
}

fn default_min_length() -> usize {
    1000
}

fn default_boundary_ratio() -> f64 {
    0.7
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            min_length: default_min_length(),
            boundary_ratio: default_boundary_ratio(),
        }
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Candidates requested from the index per result wanted
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Chunks embedded per progress step during a build
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_k() -> usize {
    5
}

fn default_overfetch_factor() -> usize {
    3
}

fn default_batch_size() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            overfetch_factor: default_overfetch_factor(),
            batch_size: default_batch_size(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl BankIqConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse without validating
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate value ranges and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }

        let ratio = self.chunking.boundary_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "chunking.boundary_ratio must be in (0, 1], got {}",
                ratio
            )));
        }

        if self.retrieval.overfetch_factor < 1 {
            return Err(ConfigError::ValidationError(
                "retrieval.overfetch_factor must be at least 1".to_string(),
            ));
        }

        if self.retrieval.batch_size < 1 {
            return Err(ConfigError::ValidationError(
                "retrieval.batch_size must be at least 1".to_string(),
            ));
        }

        if self.embedding.max_input_chars == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.max_input_chars must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimensions == Some(0) {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0 when set".to_string(),
            ));
        }

        if self.embedding.provider == EmbeddingProviderKind::OpenAI {
            match self.embedding.api_key_env {
                Some(ref env) => self.validate_env_var(env)?,
                None => {
                    return Err(ConfigError::ValidationError(
                        "embedding.api_key_env is required for the openai provider".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
