//! Filing retrieval pipeline
//!
//! Selects SEC filing excerpts for peer-analytics prompts.
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Positional first/middle/last-third chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding providers (Ollama, OpenAI-compatible) and normalization
//! - [`rag::source`](crate::rag::source) - Filing sources (directory tree, in-memory)
//! - [`rag::snapshot`](crate::rag::snapshot) - Snapshot stores for the built index
//! - [`rag::retriever`](crate::rag::retriever) - Lifecycle, filtered top-k search
//!
//! # Pipeline
//!
//! 1. **Ingestion** - Filings are listed and read from the source
//! 2. **Chunking** - Each filing is reduced to at most three excerpts
//! 3. **Embedding** - Excerpts are embedded in batches and normalized
//! 4. **Storage** - Vectors and excerpts go into one index, snapshotted to disk
//! 5. **Retrieval** - The query is embedded, candidates over-fetched, then
//!    filtered by bank
//!
//! # Example
//!
//! ```ignore
//! use bankiq::rag::retriever::Retriever;
//! use bankiq::utils::toml_config::BankIqConfig;
//!
//! let config = BankIqConfig::load("bankiq.toml")?;
//! let retriever = Retriever::from_config(&config)?;
//!
//! if retriever.initialize().await {
//!     let excerpts = retriever.search("capital adequacy", Some("ACME"), 5).await;
//! }
//! ```

pub mod chunker;
pub mod embeddings;
pub mod retriever;
pub mod snapshot;
pub mod source;
