//! Reads summaries dropped by the external summarization stage.
//!
//! One file per issue named `<issue_number>.<ext>`; anything else in the
//! directory is ignored.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use propwatch_core::is_valid_issue_number;

use crate::error::{RecordError, RecordResult};

fn summary_issue_number(file_name: &str) -> Option<u64> {
    let (stem, extension) = file_name.split_once('.')?;
    if stem.is_empty()
        || extension.is_empty()
        || !stem.bytes().all(|byte| byte.is_ascii_digit())
        || !extension.bytes().all(|byte| byte.is_ascii_alphanumeric())
    {
        return None;
    }
    stem.parse::<u64>()
        .ok()
        .filter(|number| is_valid_issue_number(*number))
}

/// Loads non-empty summary texts keyed by issue number. A missing directory
/// means no summaries are available.
pub fn load_summary_inputs(dir: &Path) -> RecordResult<BTreeMap<u64, String>> {
    let mut summaries = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(summaries),
        Err(source) => {
            return Err(RecordError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    for entry in entries {
        let entry = entry.map_err(|source| RecordError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(issue_number) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(summary_issue_number)
        else {
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => {
                summaries.insert(issue_number, text.trim().to_string());
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "skipping unreadable summary");
            }
        }
    }
    Ok(summaries)
}
