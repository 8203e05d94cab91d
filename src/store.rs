//! Directory-backed transaction store shared by producer and consumer.
//!
//! Each transaction lives in its own `transaction_<id>.json` file. There is
//! no locking and no atomic rename: files are created, read and deleted in
//! place, and a file disappearing underneath either side is not an error.

use crate::error::{PipelineError, PipelineResult};
use crate::types::transaction::Transaction;
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

const FILE_PREFIX: &str = "transaction_";
const FILE_SUFFIX: &str = ".json";

/// File name for a transaction id
pub fn file_name(id: &str) -> String {
    format!("{FILE_PREFIX}{id}{FILE_SUFFIX}")
}

/// Transaction id encoded in a store file name, if it follows the pattern
pub fn id_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// A transaction file waiting to be consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub id: String,
    pub path: PathBuf,
}

/// Handle on the shared transaction directory
#[derive(Debug, Clone)]
pub struct TransactionStore {
    dir: PathBuf,
}

impl TransactionStore {
    /// Open the store, creating the directory if needed
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create transaction directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(file_name(id))
    }

    /// Write a transaction to its own file
    pub async fn write(&self, tx: &Transaction) -> PipelineResult<PathBuf> {
        let path = self.path_for(&tx.id);
        let payload = serde_json::to_vec(tx).map_err(|e| PipelineError::Write {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| PipelineError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(transaction_id = %tx.id, path = %path.display(), "Transaction written");
        Ok(path)
    }

    /// List every transaction file currently in the directory, sorted by name
    pub async fn list_pending(&self) -> io::Result<Vec<PendingFile>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut pending = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(id) = id_from_file_name(name) {
                pending.push(PendingFile {
                    id: id.to_string(),
                    path: entry.path(),
                });
            }
        }

        pending.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(pending)
    }

    /// Load and parse a transaction file
    pub async fn read(&self, path: &Path) -> PipelineResult<Transaction> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PipelineError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| PipelineError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Delete a file. Returns `false` if it was already gone.
    pub async fn remove(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete every transaction file last modified more than `max_age`
    /// before `now`, consumed or not. Returns the ids that were removed.
    pub async fn sweep_older_than(&self, max_age: Duration, now: SystemTime) -> io::Result<Vec<String>> {
        let Some(cutoff) = now.checked_sub(max_age) else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for file in self.list_pending().await? {
            let modified = match tokio::fs::metadata(&file.path).await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to stat transaction file");
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }

            match self.remove(&file.path).await {
                Ok(true) => {
                    debug!(transaction_id = %file.id, "Swept stale transaction file");
                    removed.push(file.id);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to remove stale transaction file");
                }
            }
        }

        Ok(removed)
    }
}
