//! File-backed progress state.
//!
//! Commit logs are stored either as newline-delimited identifiers or as a
//! JSON document with a `processed` array; index cursors as a single
//! decimal integer. Every write goes to a temporary sibling first and is
//! renamed into place, so an interrupted write leaves the previous state.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CommitLog, IndexCursor, ItemId, StateStorage, StoreError};

/// JSON layout of a commit log.
#[derive(Debug, Serialize, Deserialize)]
struct CommitLogDocument {
    processed: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// JSON layout of an index cursor written by earlier deployments.
#[derive(Debug, Deserialize)]
struct IndexDocument {
    index: u64,
}

/// Encoding of a commit log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEncoding {
    /// `{"processed": [...]}`.
    Json,
    /// One identifier per line.
    Lines,
}

/// Commit log stored in a single file.
#[derive(Debug, Clone)]
pub struct CommitLogFile {
    path: PathBuf,
    encoding: LogEncoding,
}

impl CommitLogFile {
    /// Create a handle for a JSON commit log.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: LogEncoding::Json,
        }
    }

    /// Create a handle for a newline-delimited commit log.
    #[must_use]
    pub fn lines(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: LogEncoding::Lines,
        }
    }

    fn decode(&self, content: &str) -> Result<CommitLog, StoreError> {
        match self.encoding {
            LogEncoding::Lines => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ItemId::from)
                .collect()),
            LogEncoding::Json => {
                let doc: CommitLogDocument = serde_json::from_str(content)
                    .map_err(|e| StoreError::corrupt(&self.path, e.to_string()))?;
                let log: CommitLog = doc.processed.into_iter().collect();
                Ok(log.with_updated_at(doc.updated_at))
            }
        }
    }

    fn encode(&self, log: &CommitLog) -> Result<Vec<u8>, StoreError> {
        match self.encoding {
            LogEncoding::Lines => {
                let mut out = String::new();
                for id in log.iter() {
                    if id.as_str().contains(['\n', '\r']) {
                        return Err(StoreError::io(
                            &self.path,
                            std::io::Error::new(
                                ErrorKind::InvalidInput,
                                format!("identifier {id:?} contains a line break"),
                            ),
                        ));
                    }
                    out.push_str(id.as_str());
                    out.push('\n');
                }
                Ok(out.into_bytes())
            }
            LogEncoding::Json => {
                let doc = CommitLogDocument {
                    processed: log.iter().cloned().collect(),
                    updated_at: log.updated_at(),
                };
                let mut bytes = serde_json::to_vec_pretty(&doc)
                    .map_err(|e| StoreError::io(&self.path, e.into()))?;
                bytes.push(b'\n');
                Ok(bytes)
            }
        }
    }
}

impl StateStorage<CommitLog> for CommitLogFile {
    fn load(&self) -> Result<CommitLog, StoreError> {
        match read_state(&self.path)? {
            Some(content) => self.decode(&content),
            None => {
                tracing::debug!(path = %self.path.display(), "No commit log yet, starting empty");
                Ok(CommitLog::new())
            }
        }
    }

    fn persist(&self, log: &CommitLog) -> Result<(), StoreError> {
        let bytes = self.encode(log)?;
        write_atomically(&self.path, &bytes)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Index cursor stored as a plain decimal integer.
///
/// A JSON `{"index": N}` document is also read, and is replaced by the plain
/// form on the next commit.
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    /// Create a handle for an index file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStorage<IndexCursor> for IndexFile {
    fn load(&self) -> Result<IndexCursor, StoreError> {
        let Some(content) = read_state(&self.path)? else {
            return Ok(IndexCursor::default());
        };

        let trimmed = content.trim();
        if trimmed.starts_with('{') {
            let doc: IndexDocument = serde_json::from_str(trimmed)
                .map_err(|e| StoreError::corrupt(&self.path, e.to_string()))?;
            return Ok(IndexCursor(doc.index));
        }

        trimmed.parse::<u64>().map(IndexCursor).map_err(|e| {
            StoreError::corrupt(&self.path, format!("expected a count, found {trimmed:?}: {e}"))
        })
    }

    fn persist(&self, cursor: &IndexCursor) -> Result<(), StoreError> {
        write_atomically(&self.path, format!("{cursor}\n").as_bytes())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Read a state file; `None` if it does not exist.
fn read_state(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            Err(StoreError::corrupt(path, format!("not valid UTF-8: {e}")))
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Replace `path` with `bytes` via a temporary sibling and rename.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let write = || -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    tracing::trace!(path = %path.display(), bytes = bytes.len(), "State written");
    Ok(())
}
