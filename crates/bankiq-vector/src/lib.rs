//! # bankiq-vector
//!
//! An append-only, exact nearest-neighbor vector index for retrieval over
//! filing excerpts.
//!
//! ## Features
//!
//! - **Exact search**: Every query scans all entries, so ranking is
//!   deterministic (ties resolve by insertion order)
//! - **Parallel payloads**: Each vector carries one caller-defined payload,
//!   stored and persisted alongside it
//! - **All-or-nothing inserts**: A batch is fully validated before anything
//!   is appended
//! - **Checksummed snapshots**: Vectors and payloads persist as one atomic,
//!   self-validating file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bankiq_vector::{IndexConfig, VectorIndex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bankiq_vector::Error> {
//!     let index: VectorIndex<String> = VectorIndex::new(IndexConfig::default());
//!
//!     // Vectors must be unit length for inner-product ranking
//!     index.insert(vec![vec![0.6, 0.8]], vec!["first".to_string()])?;
//!
//!     let hits = index.search(&[0.6, 0.8], 5)?;
//!     assert_eq!(hits[0].id, 0);
//!
//!     index.save("./data/index.bqvx").await?;
//!     let restored: VectorIndex<String> = VectorIndex::load("./data/index.bqvx").await?;
//!     assert_eq!(restored.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                VectorIndex<M>                 │
//! │  ┌────────────────────┐  ┌─────────────────┐ │
//! │  │ vectors (flat f32) │  │  payloads: [M]  │ │
//! │  │  n * dimensions    │  │  n entries      │ │
//! │  └────────────────────┘  └─────────────────┘ │
//! │            id = insertion position            │
//! └──────────────────────────────────────────────┘
//!                       │ to_bytes / save
//!                       ▼
//!   magic | version | sha256 | postcard(config, vectors, payloads)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use config::IndexConfig;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::VectorIndex;
pub use persistence::write_atomic;
pub use types::{EntryId, IndexStats, SearchHit};
