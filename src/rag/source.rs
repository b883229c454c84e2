//! Filing sources.
//!
//! A source enumerates filings tagged by bank, year and filing type, and
//! reads their text on demand. Failures on individual filings are reported
//! per document so a build can skip them and carry on.

use crate::types::{AppError, Document, Result};
use crate::utils::toml_config::SourceConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to one filing, as returned by [`DocumentSource::list`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentRef {
    pub bank: String,
    pub year: String,
    pub filing_type: String,
    pub file: String,
    /// Source-specific locator
    pub location: PathBuf,
}

impl DocumentRef {
    pub fn into_document(self, text: String) -> Document {
        Document {
            bank: self.bank,
            year: self.year,
            filing_type: self.filing_type,
            file: self.file,
            text,
        }
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Enumerate available filings in a stable order
    async fn list(&self) -> Result<Vec<DocumentRef>>;

    /// Read the full text of one filing
    async fn read(&self, doc: &DocumentRef) -> Result<String>;
}

// ============= Filesystem =============

/// Reads `root/<bank>/<year>/<filing_type>/*.<extension>`.
///
/// Year directories must be numeric; anything else is skipped with a
/// warning. Filings older than `min_year` are ignored.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    root: PathBuf,
    min_year: u32,
    extension: String,
}

impl FilesystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            min_year: 0,
            extension: "txt".to_string(),
        }
    }

    pub fn with_min_year(mut self, min_year: u32) -> Self {
        self.min_year = min_year;
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(&config.root)
            .with_min_year(config.min_year)
            .with_extension(&config.extension)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.extension.as_str())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentSource for FilesystemSource {
    fn describe(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    async fn list(&self) -> Result<Vec<DocumentRef>> {
        let banks = sorted_entries(&self.root).await.map_err(|e| {
            AppError::SourceUnavailable(format!("{}: {}", self.root.display(), e))
        })?;

        let mut docs = Vec::new();
        for (bank, bank_path, is_dir) in banks {
            if !is_dir {
                continue;
            }

            for (year, year_path, is_dir) in entries_or_warn(&bank_path).await {
                if !is_dir {
                    continue;
                }
                let year_num: u32 = match year.parse() {
                    Ok(n) => n,
                    Err(_) => {
                        warn!(bank = %bank, dir = %year, "Skipping non-numeric year directory");
                        continue;
                    }
                };
                if year_num < self.min_year {
                    debug!(bank = %bank, year = %year, "Skipping filings below minimum year");
                    continue;
                }

                for (filing_type, filing_path, is_dir) in entries_or_warn(&year_path).await {
                    if !is_dir {
                        continue;
                    }

                    for (file, path, is_dir) in entries_or_warn(&filing_path).await {
                        if is_dir || !self.has_extension(&path) {
                            continue;
                        }
                        docs.push(DocumentRef {
                            bank: bank.clone(),
                            year: year.clone(),
                            filing_type: filing_type.clone(),
                            file,
                            location: path,
                        });
                    }
                }
            }
        }

        debug!(count = docs.len(), root = %self.root.display(), "Listed filings");
        Ok(docs)
    }

    async fn read(&self, doc: &DocumentRef) -> Result<String> {
        let bytes = tokio::fs::read(&doc.location).await.map_err(|e| {
            AppError::SourceUnavailable(format!("{}: {}", doc.location.display(), e))
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Directory entries as (name, path, is_dir), sorted by name.
async fn sorted_entries(dir: &Path) -> std::io::Result<Vec<(String, PathBuf, bool)>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        // Follow symlinks so linked filing trees are indexed
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push((entry.file_name().to_string_lossy().into_owned(), path, is_dir));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

async fn entries_or_warn(dir: &Path) -> Vec<(String, PathBuf, bool)> {
    match sorted_entries(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            Vec::new()
        }
    }
}

// ============= In-memory =============

/// Caller-owned set of documents, e.g. filings uploaded in one session.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: RwLock<Vec<Document>>,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    pub fn push(&self, document: Document) {
        self.documents.write().push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory:{} documents", self.len())
    }

    async fn list(&self) -> Result<Vec<DocumentRef>> {
        Ok(self
            .documents
            .read()
            .iter()
            .enumerate()
            .map(|(idx, doc)| DocumentRef {
                bank: doc.bank.clone(),
                year: doc.year.clone(),
                filing_type: doc.filing_type.clone(),
                file: doc.file.clone(),
                location: PathBuf::from(idx.to_string()),
            })
            .collect())
    }

    async fn read(&self, doc: &DocumentRef) -> Result<String> {
        let missing =
            || AppError::SourceUnavailable(format!("no document at {}", doc.location.display()));
        let idx: usize = doc
            .location
            .to_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(missing)?;

        self.documents
            .read()
            .get(idx)
            .map(|d| d.text.clone())
            .ok_or_else(missing)
    }
}
