//! Snapshot persistence for bankiq-vector.
//!
//! A snapshot is a single self-validating blob holding the index
//! configuration, every vector, and every payload:
//!
//! ```text
//! +----------+-------------+------------------+-----------------------+
//! | magic(8) | version(u32)| sha256(body)(32) | body (postcard)       |
//! +----------+-------------+------------------+-----------------------+
//! ```
//!
//! Vectors and payloads travel together, so they can never be loaded from
//! mismatched files. Decoding fails closed: any inconsistency is reported
//! as [`Error::Corrupt`] rather than yielding an empty or partial index.

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::{IndexData, VectorIndex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Leading bytes of every snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"BQVXSNAP";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 4 + 32;

#[derive(Serialize)]
struct SnapshotBodyRef<'a, M> {
    config: &'a IndexConfig,
    dimensions: Option<usize>,
    vectors: &'a [f32],
    payloads: &'a [M],
}

#[derive(Deserialize)]
struct SnapshotBody<M> {
    config: IndexConfig,
    dimensions: Option<usize>,
    vectors: Vec<f32>,
    payloads: Vec<M>,
}

impl<M: Serialize> VectorIndex<M> {
    /// Encode the index as snapshot bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data = self.inner.read();
        let body = SnapshotBodyRef {
            config: self.config(),
            dimensions: data.dimensions,
            vectors: &data.vectors,
            payloads: &data.payloads,
        };
        let body = postcard::to_allocvec(&body)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot: {}", e)))?;

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&Sha256::digest(&body));
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Write the index to `path` atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes).await?;
        info!(path = %path.display(), entries = self.len(), bytes = bytes.len(), "Saved index snapshot");
        Ok(())
    }
}

impl<M: DeserializeOwned> VectorIndex<M> {
    /// Decode an index from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] if the header, checksum, body, or the
    /// vector/payload length invariant does not check out.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Corrupt(format!(
                "Snapshot is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let (magic, rest) = bytes.split_at(SNAPSHOT_MAGIC.len());
        if magic != SNAPSHOT_MAGIC {
            return Err(Error::Corrupt("Bad magic bytes".to_string()));
        }

        let (version, rest) = rest.split_at(4);
        let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
        if version != SNAPSHOT_VERSION {
            return Err(Error::Corrupt(format!(
                "Unsupported snapshot version {} (expected {})",
                version, SNAPSHOT_VERSION
            )));
        }

        let (checksum, body) = rest.split_at(32);
        if Sha256::digest(body).as_slice() != checksum {
            return Err(Error::Corrupt("Checksum mismatch".to_string()));
        }

        let body: SnapshotBody<M> = postcard::from_bytes(body)
            .map_err(|e| Error::Corrupt(format!("Failed to decode snapshot body: {}", e)))?;

        validate_body(&body)?;

        debug!(
            entries = body.payloads.len(),
            dimensions = ?body.dimensions,
            "Decoded index snapshot"
        );

        Ok(VectorIndex::from_parts(
            body.config,
            IndexData {
                dimensions: body.dimensions,
                vectors: body.vectors,
                payloads: body.payloads,
            },
        ))
    }

    /// Load an index previously written with [`save`](VectorIndex::save).
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if nothing exists at `path`, [`Error::Corrupt`]
    /// if the file is not a valid snapshot.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let index = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), entries = index.len(), "Loaded index snapshot");
        Ok(index)
    }
}

fn validate_body<M>(body: &SnapshotBody<M>) -> Result<()> {
    match body.dimensions {
        Some(0) => Err(Error::Corrupt("Zero dimensionality".to_string())),
        Some(dimensions) => {
            let expected = dimensions.checked_mul(body.payloads.len()).ok_or_else(|| {
                Error::Corrupt(format!(
                    "Dimensionality {} overflows for {} payloads",
                    dimensions,
                    body.payloads.len()
                ))
            })?;
            if body.vectors.len() != expected {
                return Err(Error::Corrupt(format!(
                    "Parallel arrays disagree: {} floats for {} payloads of dimension {}",
                    body.vectors.len(),
                    body.payloads.len(),
                    dimensions
                )));
            }
            if body.config.dimensions.is_some_and(|d| d != dimensions) {
                return Err(Error::Corrupt(
                    "Stored dimensionality disagrees with configuration".to_string(),
                ));
            }
            if body.vectors.iter().any(|v| !v.is_finite()) {
                return Err(Error::Corrupt("Snapshot contains NaN or Inf".to_string()));
            }
            Ok(())
        }
        None if body.vectors.is_empty() && body.payloads.is_empty() => Ok(()),
        None => Err(Error::Corrupt(
            "Entries present without a dimensionality".to_string(),
        )),
    }
}

/// Write `bytes` to `path` so readers never observe a partial file.
///
/// The data goes to a sibling temp file which is flushed, synced and then
/// renamed over the destination. Parent directories are created as needed.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
