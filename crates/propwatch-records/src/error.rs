use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for record persistence operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// A persisted record file that exists but cannot be trusted.
#[derive(Debug, Error)]
#[error("invalid record file {}: {reason}", path.display())]
pub struct ValidationError {
    pub path: PathBuf,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by the record, change-log and summary-input stores.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to encode record front matter: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to encode change log: {0}")]
    Json(#[from] serde_json::Error),
}
