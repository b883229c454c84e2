//! # BankIQ Retrieval
//!
//! The retrieval core behind BankIQ peer analytics: it turns a tree of SEC
//! filings into a searchable index and returns the excerpts most relevant
//! to a question, optionally restricted to one bank.
//!
//! ## Overview
//!
//! BankIQ retrieval can be used in two ways:
//!
//! 1. **As a CLI** - Run the `bankiq-rag` binary to build the index or query it
//! 2. **As a library** - Embed a [`Retriever`] in the prompt-assembly layer
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use bankiq::{BankIqConfig, Retriever};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BankIqConfig::load("bankiq.toml")?;
//!     let retriever = Retriever::from_config(&config)?;
//!
//!     // Loads the snapshot, or builds and saves a fresh index
//!     if !retriever.initialize().await {
//!         eprintln!("retrieval unavailable: {}", retriever.status());
//!     }
//!
//!     for excerpt in retriever.search("credit loss reserves", Some("ACME"), 5).await {
//!         println!("{:.3} {} {}", excerpt.score, excerpt.metadata.bank, excerpt.metadata.file);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Sources and Providers
//!
//! ```rust,ignore
//! use bankiq::rag::{embeddings::EmbeddingService, snapshot::MemorySnapshotStore, source::MemorySource};
//! use bankiq::{Retriever, RetrieverSettings};
//! use std::sync::Arc;
//!
//! let retriever = Retriever::new(
//!     RetrieverSettings::default(),
//!     EmbeddingService::new(Arc::new(my_provider)),
//!     Arc::new(MemorySource::new(uploaded_documents)),
//!     Some(Arc::new(MemorySnapshotStore::new())),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`rag`] - Chunking, embedding, sources, snapshots, and the retriever
//! - [`cli`] - Command-line interface for the `bankiq-rag` binary
//! - [`types`] - Filing types and error handling
//! - [`utils`] - TOML configuration
//!
//! The vector index itself lives in the `bankiq-vector` crate.

#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface and colored output.
pub mod cli;
/// Retrieval pipeline: chunking, embeddings, sources, snapshots, retriever.
pub mod rag;
/// Filing types and error handling.
pub mod types;
/// Configuration loading.
pub mod utils;

// Re-export commonly used types
pub use rag::embeddings::{EmbeddingProvider, EmbeddingService};
pub use rag::retriever::{Retriever, RetrieverSettings};
pub use types::{AppError, Result, RetrievedChunk, RetrieverStatus};
pub use utils::toml_config::BankIqConfig;
