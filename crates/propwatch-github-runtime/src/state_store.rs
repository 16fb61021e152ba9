//! Cursor persistence for the minutes comment stream.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use propwatch_core::{write_text_atomic, Cursor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURSOR_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported state schema in {path}: expected {expected}, found {found}")]
    UnsupportedSchema {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cursor state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorStateFile {
    schema_version: u32,
    last_comment_id: u64,
    last_processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CursorStateStore {
    path: PathBuf,
}

impl CursorStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted cursor. A missing file means the tracker has never
    /// run; anything unreadable is an error rather than a silent fresh start.
    pub fn load_state(&self) -> Result<Option<Cursor>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let state = serde_json::from_str::<CursorStateFile>(&raw).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        if state.schema_version != CURSOR_STATE_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                path: self.path.clone(),
                expected: CURSOR_STATE_SCHEMA_VERSION,
                found: state.schema_version,
            });
        }
        Ok(Some(Cursor {
            last_comment_id: state.last_comment_id,
            last_processed_at: state.last_processed_at,
        }))
    }

    pub fn save_state(&self, cursor: &Cursor) -> Result<(), StorageError> {
        let state = CursorStateFile {
            schema_version: CURSOR_STATE_SCHEMA_VERSION,
            last_comment_id: cursor.last_comment_id,
            last_processed_at: cursor.last_processed_at,
        };
        let mut payload = serde_json::to_string_pretty(&state).map_err(StorageError::Encode)?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            last_comment_id = cursor.last_comment_id,
            "saved cursor state"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use propwatch_core::parse_rfc3339_utc;
    use tempfile::tempdir;

    use super::*;

    fn cursor(id: u64, at: &str) -> Cursor {
        Cursor {
            last_comment_id: id,
            last_processed_at: parse_rfc3339_utc(at).expect("timestamp"),
        }
    }

    #[test]
    fn unit_load_state_returns_none_for_missing_file() {
        let temp = tempdir().expect("tempdir");
        let store = CursorStateStore::new(temp.path().join("state.json"));
        assert!(store.load_state().expect("load").is_none());
    }

    #[test]
    fn functional_save_then_load_restores_cursor_with_schema_version() {
        let temp = tempdir().expect("tempdir");
        let store = CursorStateStore::new(temp.path().join("nested").join("state.json"));
        let saved = cursor(1_234_567, "2026-03-04T05:06:07Z");
        store.save_state(&saved).expect("save");

        let raw = std::fs::read_to_string(store.path()).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["schema_version"], CURSOR_STATE_SCHEMA_VERSION);
        assert_eq!(value["last_comment_id"], 1_234_567);
        assert_eq!(store.load_state().expect("load"), Some(saved));
    }

    #[test]
    fn regression_load_state_rejects_corrupt_file_instead_of_starting_fresh() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json").expect("write");
        let error = CursorStateStore::new(&path)
            .load_state()
            .expect_err("corrupt state should fail");
        assert!(matches!(error, StorageError::Corrupt { .. }));
    }

    #[test]
    fn regression_load_state_rejects_unknown_schema_version() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"schema_version":9,"last_comment_id":1,"last_processed_at":"2026-01-01T00:00:00Z"}"#,
        )
        .expect("write");
        let error = CursorStateStore::new(&path)
            .load_state()
            .expect_err("schema mismatch should fail");
        assert!(matches!(
            error,
            StorageError::UnsupportedSchema { found: 9, .. }
        ));
    }
}
