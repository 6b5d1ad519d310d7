//! Domain-level error types for repost-cursor.
//!
//! All errors are typed with `thiserror`. Store errors are kept separate so
//! callers can tell "state could not be read or written" apart from
//! collaborator failures.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the durable progress store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// State file could not be read or written.
    #[error("State I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but cannot be parsed. Never reset silently.
    #[error("Corrupt state in {path}: {message}")]
    CorruptState { path: PathBuf, message: String },

    /// A positional store was asked to commit an item other than the one at
    /// its cursor.
    #[error("Cannot commit {id}: the index cursor points at {expected}")]
    OutOfOrder { id: String, expected: String },

    /// Another run holds the advisory lock.
    #[error("State is locked by another run: {path}")]
    Locked { path: PathBuf },
}

impl StoreError {
    /// Create an IO error for a state path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a corrupt-state error for a state path.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Progress store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Work source could not produce a listing.
    #[error("Work source error: {message}")]
    WorkSource {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Processor reported failure for an item.
    #[error("Processor error: {message}")]
    Processor {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a work source error without an underlying cause.
    pub fn work_source(message: impl Into<String>) -> Self {
        Self::WorkSource {
            message: message.into(),
            source: None,
        }
    }

    /// Create a processor error without an underlying cause.
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_transparent() {
        let err: AppError = StoreError::corrupt("/tmp/state.json", "expected value").into();
        assert_eq!(
            err.to_string(),
            "Corrupt state in /tmp/state.json: expected value"
        );
    }
}
