//! Rendered file contents that have not reached disk yet.

use std::path::PathBuf;

use propwatch_core::write_text_atomic;

use crate::error::{RecordError, RecordResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWrite {
    pub path: PathBuf,
    pub contents: String,
}

impl StagedWrite {
    pub fn commit(&self) -> RecordResult<()> {
        write_text_atomic(&self.path, &self.contents).map_err(|source| RecordError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
