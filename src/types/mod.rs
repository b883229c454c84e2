use serde::{Deserialize, Serialize};
use std::fmt;

// ============= Filing Types =============

/// Tags identifying where a chunk of filing text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMetadata {
    /// Entity tag, e.g. "JPMORGAN CHASE"
    pub bank: String,
    /// Period tag (filing year)
    pub year: String,
    /// Category tag, e.g. "10-K"
    pub filing_type: String,
    /// Source file name within the filing directory
    pub file: String,
    /// Ordinal of the chunk within its document
    pub chunk_id: usize,
}

/// One source filing, read once at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub bank: String,
    pub year: String,
    pub filing_type: String,
    pub file: String,
    pub text: String,
}

impl Document {
    /// Metadata for the chunk at `chunk_id` of this document.
    pub fn chunk_metadata(&self, chunk_id: usize) -> FilingMetadata {
        FilingMetadata {
            bank: self.bank.clone(),
            year: self.year.clone(),
            filing_type: self.filing_type.clone(),
            file: self.file.clone(),
            chunk_id,
        }
    }
}

/// Stored alongside every vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: FilingMetadata,
}

/// A ranked search result handed to the prompt assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub score: f32,
    pub metadata: FilingMetadata,
}

/// Observable lifecycle of the retriever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RetrieverStatus {
    Uninitialized,
    Ready { entries: usize },
    Failed { reason: String },
}

impl RetrieverStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, RetrieverStatus::Ready { .. })
    }
}

impl fmt::Display for RetrieverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieverStatus::Uninitialized => write!(f, "uninitialized"),
            RetrieverStatus::Ready { entries } => write!(f, "ready ({} entries)", entries),
            RetrieverStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index snapshot corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector index error: {0}")]
    Vector(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bankiq_vector::Error> for AppError {
    fn from(err: bankiq_vector::Error) -> Self {
        match err {
            bankiq_vector::Error::Corrupt(msg) => AppError::IndexCorrupt(msg),
            bankiq_vector::Error::DimensionMismatch { expected, actual } => {
                AppError::DimensionMismatch { expected, actual }
            }
            other => AppError::Vector(other.to_string()),
        }
    }
}

impl From<crate::utils::toml_config::ConfigError> for AppError {
    fn from(err: crate::utils::toml_config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        Document {
            bank: "ACME BANK".to_string(),
            year: "2024".to_string(),
            filing_type: "10-K".to_string(),
            file: "annual.txt".to_string(),
            text: "Risk factors.".to_string(),
        }
    }

    #[test]
    fn test_chunk_metadata_copies_tags() {
        let meta = sample_document().chunk_metadata(2);
        assert_eq!(meta.bank, "ACME BANK");
        assert_eq!(meta.year, "2024");
        assert_eq!(meta.filing_type, "10-K");
        assert_eq!(meta.file, "annual.txt");
        assert_eq!(meta.chunk_id, 2);
    }

    #[test]
    fn test_retrieved_chunk_json_shape() {
        let row = RetrievedChunk {
            content: "Credit risk increased.".to_string(),
            score: 0.5,
            metadata: sample_document().chunk_metadata(0),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["content"], "Credit risk increased.");
        assert_eq!(json["metadata"]["bank"], "ACME BANK");
        assert_eq!(json["metadata"]["filing_type"], "10-K");
    }

    #[test]
    fn test_vector_error_mapping() {
        let corrupt: AppError = bankiq_vector::Error::Corrupt("bad magic".to_string()).into();
        assert!(matches!(corrupt, AppError::IndexCorrupt(_)));

        let dims: AppError = bankiq_vector::Error::DimensionMismatch {
            expected: 4,
            actual: 3,
        }
        .into();
        assert!(matches!(
            dims,
            AppError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));

        let other: AppError = bankiq_vector::Error::NotFound("x".to_string()).into();
        assert!(matches!(other, AppError::Vector(_)));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RetrieverStatus::Uninitialized.to_string(), "uninitialized");
        assert_eq!(
            RetrieverStatus::Ready { entries: 3 }.to_string(),
            "ready (3 entries)"
        );
        assert!(RetrieverStatus::Ready { entries: 0 }.is_ready());
        assert!(!RetrieverStatus::Failed {
            reason: "x".to_string()
        }
        .is_ready());
    }
}
