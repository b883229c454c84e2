//! Retrieval over indexed filing excerpts.
//!
//! [`Retriever`] owns the whole lifecycle: load a snapshot or build an index
//! from the filing source, persist it, and answer filtered top-k queries.
//! Failures never cross this boundary. `initialize` and `rebuild` report a
//! boolean and `search` degrades to an empty result.
//!
//! # State
//!
//! ```text
//! Uninitialized --initialize ok--> Ready --rebuild ok--> Ready
//!       |                            |
//!       +----initialize err---> Failed <--rebuild err--+
//!                                  |
//!                                  +--rebuild ok--> Ready
//! ```
//!
//! The ready index sits behind an [`ArcSwap`]. Searches take a reference to
//! the current index and never wait on a rebuild; a rebuild swaps the new
//! index in only once it is complete.

use crate::rag::chunker::ThirdsChunker;
use crate::rag::embeddings::EmbeddingService;
use crate::rag::snapshot::{FileSnapshotStore, SnapshotStore};
use crate::rag::source::{DocumentSource, FilesystemSource};
use crate::types::{AppError, Chunk, Document, Result, RetrievedChunk, RetrieverStatus};
use crate::utils::toml_config::BankIqConfig;
use arc_swap::ArcSwap;
use bankiq_vector::{IndexConfig, VectorIndex};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Index type served by the retriever
pub type FilingIndex = VectorIndex<Chunk>;

/// Tunables for building and querying.
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub chunker: ThirdsChunker,
    pub index: IndexConfig,
    pub default_k: usize,
    pub overfetch_factor: usize,
    pub batch_size: usize,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            chunker: ThirdsChunker::default(),
            index: IndexConfig::default(),
            default_k: 5,
            overfetch_factor: 3,
            batch_size: 10,
        }
    }
}

impl RetrieverSettings {
    pub fn from_config(config: &BankIqConfig) -> Self {
        let mut index = IndexConfig::new()
            .with_metric(config.index.metric)
            .with_require_normalized(config.index.require_normalized);
        if let Some(dimensions) = config.embedding.dimensions {
            index = index.with_dimensions(dimensions);
        }

        Self {
            chunker: ThirdsChunker::from_config(&config.chunking),
            index,
            default_k: config.retrieval.default_k,
            overfetch_factor: config.retrieval.overfetch_factor.max(1),
            batch_size: config.retrieval.batch_size.max(1),
        }
    }
}

enum State {
    Uninitialized,
    Ready(Arc<FilingIndex>),
    Failed(String),
}

pub struct Retriever {
    settings: RetrieverSettings,
    embedder: EmbeddingService,
    source: Arc<dyn DocumentSource>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    state: ArcSwap<State>,
    /// Serializes initialize/rebuild
    lifecycle: tokio::sync::Mutex<()>,
}

impl Retriever {
    pub fn new(
        settings: RetrieverSettings,
        embedder: EmbeddingService,
        source: Arc<dyn DocumentSource>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Self {
        Self {
            settings,
            embedder,
            source,
            snapshots,
            state: ArcSwap::from_pointee(State::Uninitialized),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Wire up the filesystem source, file snapshot and configured provider
    pub fn from_config(config: &BankIqConfig) -> Result<Self> {
        let embedder = EmbeddingService::from_config(&config.embedding)?;
        let source: Arc<dyn DocumentSource> =
            Arc::new(FilesystemSource::from_config(&config.source));
        let snapshots = config
            .index
            .snapshot_path
            .as_ref()
            .map(|path| Arc::new(FileSnapshotStore::new(path)) as Arc<dyn SnapshotStore>);

        Ok(Self::new(
            RetrieverSettings::from_config(config),
            embedder,
            source,
            snapshots,
        ))
    }

    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    pub fn status(&self) -> RetrieverStatus {
        match &**self.state.load() {
            State::Uninitialized => RetrieverStatus::Uninitialized,
            State::Ready(index) => RetrieverStatus::Ready {
                entries: index.len(),
            },
            State::Failed(reason) => RetrieverStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// The index currently being served, if ready
    pub fn index(&self) -> Option<Arc<FilingIndex>> {
        match &**self.state.load() {
            State::Ready(index) => Some(Arc::clone(index)),
            _ => None,
        }
    }

    /// Load the snapshot, or build from the source and persist.
    ///
    /// Runs once. Later calls return the recorded outcome without doing any
    /// work; use [`rebuild`](Self::rebuild) to start over. May take minutes
    /// on a large corpus, so call it from a startup task rather than a
    /// request handler.
    #[instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn initialize(&self) -> bool {
        let _guard = self.lifecycle.lock().await;

        match &**self.state.load() {
            State::Ready(_) => return true,
            State::Failed(_) => return false,
            State::Uninitialized => {}
        }

        let outcome = match self.load_snapshot().await {
            Some(index) => Ok(index),
            None => {
                info!("No usable snapshot, building index from source");
                self.build_and_persist().await
            }
        };
        self.settle(outcome)
    }

    /// Discard the current index and rebuild from the source.
    ///
    /// Any snapshot is ignored and overwritten. Searches keep using the
    /// previous index until the new one is ready.
    #[instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn rebuild(&self) -> bool {
        let _guard = self.lifecycle.lock().await;
        let outcome = self.build_and_persist().await;
        self.settle(outcome)
    }

    /// Top-`k` excerpts for `query`, optionally restricted to banks whose
    /// name contains `filter_tag` (case-insensitive). `None` and `""` apply
    /// no filter; any other tag, whitespace included, is matched as given.
    ///
    /// Returns fewer than `k` results when the filter leaves fewer among the
    /// over-fetched candidates. Never errors: an unavailable index or a
    /// failed query embedding yields an empty list.
    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        filter_tag: Option<&str>,
        k: usize,
    ) -> Vec<RetrievedChunk> {
        if k == 0 {
            return Vec::new();
        }

        let index = match self.index() {
            Some(index) => index,
            None => {
                debug!(status = %self.status(), "Search on unavailable retriever");
                return Vec::new();
            }
        };

        match self.try_search(&index, query, filter_tag, k).await {
            Ok(results) => {
                debug!(count = results.len(), "Search complete");
                results
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        index: &FilingIndex,
        query: &str,
        filter_tag: Option<&str>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let candidates = k.saturating_mul(self.settings.overfetch_factor);
        let hits = index.search_with_payloads(&query_vector, candidates)?;

        let filter = filter_tag
            .filter(|tag| !tag.is_empty())
            .map(str::to_uppercase);

        Ok(hits
            .into_iter()
            .filter(|(_, chunk)| match filter {
                Some(ref tag) => chunk.metadata.bank.to_uppercase().contains(tag.as_str()),
                None => true,
            })
            .take(k)
            .map(|(hit, chunk)| RetrievedChunk {
                content: chunk.text,
                score: hit.score,
                metadata: chunk.metadata,
            })
            .collect())
    }

    fn settle(&self, outcome: Result<Arc<FilingIndex>>) -> bool {
        match outcome {
            Ok(index) => {
                info!(entries = index.len(), "Retriever ready");
                self.state.store(Arc::new(State::Ready(index)));
                true
            }
            Err(e) => {
                error!(error = %e, "Retriever unavailable");
                self.state.store(Arc::new(State::Failed(e.to_string())));
                false
            }
        }
    }

    async fn load_snapshot(&self) -> Option<Arc<FilingIndex>> {
        let store = self.snapshots.as_ref()?;

        let bytes = match store.read().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(snapshot = %store.describe(), "No snapshot found");
                return None;
            }
            Err(e) => {
                warn!(snapshot = %store.describe(), error = %e, "Failed to read snapshot");
                return None;
            }
        };

        let index = match FilingIndex::from_bytes(&bytes) {
            Ok(index) => index,
            Err(e) => {
                let e = AppError::from(e);
                warn!(snapshot = %store.describe(), error = %e, "Discarding unusable snapshot");
                return None;
            }
        };

        if let Some(reason) = self.stale_reason(&index) {
            warn!(snapshot = %store.describe(), reason, "Discarding stale snapshot");
            return None;
        }

        info!(
            snapshot = %store.describe(),
            entries = index.len(),
            "Loaded index snapshot"
        );
        Some(Arc::new(index))
    }

    fn stale_reason(&self, index: &FilingIndex) -> Option<&'static str> {
        if index.is_empty() {
            return Some("snapshot holds no entries");
        }
        if let (Some(expected), Some(actual)) = (self.embedder.dimensions(), index.dimensions()) {
            if expected != actual {
                return Some("snapshot dimensionality differs from embedding model");
            }
        }
        if index.metric() != self.settings.index.metric {
            return Some("snapshot metric differs from configuration");
        }
        None
    }

    async fn build_and_persist(&self) -> Result<Arc<FilingIndex>> {
        let index = self.build().await?;
        self.persist(&index).await;
        Ok(Arc::new(index))
    }

    async fn build(&self) -> Result<FilingIndex> {
        let documents = self.load_documents().await?;

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| {
                self.settings
                    .chunker
                    .chunk(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(ordinal, text)| Chunk {
                        text,
                        metadata: doc.chunk_metadata(ordinal),
                    })
            })
            .collect();

        if chunks.is_empty() {
            return Err(AppError::SourceUnavailable(format!(
                "{} documents produced no chunks",
                documents.len()
            )));
        }
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Chunked filings"
        );

        let mut config = self.settings.index.clone();
        if let Some(dimensions) = self.embedder.dimensions() {
            config = config.with_dimensions(dimensions);
        }
        let index = FilingIndex::new(config);

        let batch_size = self.settings.batch_size.max(1);
        let total = chunks.len().div_ceil(batch_size);
        for (n, batch) in chunks.chunks(batch_size).enumerate() {
            info!(batch = n + 1, total, "Embedding batch");
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            index.insert(vectors, batch.to_vec())?;
        }

        info!(entries = index.len(), "Built index");
        Ok(index)
    }

    async fn load_documents(&self) -> Result<Vec<Document>> {
        let refs = self.source.list().await?;
        let listed = refs.len();

        let mut documents = Vec::with_capacity(listed);
        for doc in refs {
            match self.source.read(&doc).await {
                Ok(text) => {
                    debug!(bank = %doc.bank, file = %doc.file, "Read filing");
                    documents.push(doc.into_document(text));
                }
                Err(e) => {
                    warn!(bank = %doc.bank, file = %doc.file, error = %e, "Skipping unreadable filing");
                }
            }
        }

        if documents.is_empty() {
            return Err(AppError::SourceUnavailable(format!(
                "no readable documents in {} ({} listed)",
                self.source.describe(),
                listed
            )));
        }
        Ok(documents)
    }

    async fn persist(&self, index: &FilingIndex) {
        let store = match self.snapshots {
            Some(ref store) => store,
            None => return,
        };

        let written = match index.to_bytes() {
            Ok(bytes) => store.write(&bytes).await,
            Err(e) => Err(e.into()),
        };

        match written {
            Ok(()) => info!(snapshot = %store.describe(), "Saved index snapshot"),
            Err(e) => warn!(
                snapshot = %store.describe(),
                error = %e,
                "Failed to save index snapshot; serving unsaved index"
            ),
        }
    }
}
