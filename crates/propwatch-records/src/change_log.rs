//! Per-period change output consumed by rendering and summarization stages.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use propwatch_core::{ProposalChange, ReportingPeriod};
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult, ValidationError};
use crate::staged_write::StagedWrite;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodChangeLog {
    pub period: ReportingPeriod,
    pub updated_at: DateTime<Utc>,
    pub changes: Vec<ProposalChange>,
}

pub fn change_log_path(data_dir: &Path, period: ReportingPeriod) -> PathBuf {
    data_dir
        .join("changes")
        .join(format!("{}.json", period.label()))
}

pub fn load_period_changes(
    data_dir: &Path,
    period: ReportingPeriod,
) -> RecordResult<Option<PeriodChangeLog>> {
    let path = change_log_path(data_dir, period);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(RecordError::Read { path, source }),
    };
    let log: PeriodChangeLog = serde_json::from_str(&raw)
        .map_err(|error| ValidationError::new(&path, format!("malformed change log: {error}")))?;
    if log.period != period {
        return Err(ValidationError::new(
            &path,
            format!("change log is tagged {} instead of {period}", log.period),
        )
        .into());
    }
    Ok(Some(log))
}

/// Renders the period's change log with `changes` added. A change for the
/// same issue from the same comment replaces the earlier entry.
pub fn stage_period_changes(
    data_dir: &Path,
    period: ReportingPeriod,
    changes: &[ProposalChange],
    now: DateTime<Utc>,
) -> RecordResult<StagedWrite> {
    let mut merged = load_period_changes(data_dir, period)?
        .map(|log| log.changes)
        .unwrap_or_default();
    for change in changes {
        merged.retain(|existing| {
            existing.issue_number != change.issue_number
                || existing.comment_url != change.comment_url
        });
        merged.push(change.clone());
    }
    merged.sort_by(|left, right| left.changed_at.cmp(&right.changed_at));

    let log = PeriodChangeLog {
        period,
        updated_at: now,
        changes: merged,
    };
    Ok(StagedWrite {
        path: change_log_path(data_dir, period),
        contents: serde_json::to_string_pretty(&log)?,
    })
}

pub fn write_period_changes(
    data_dir: &Path,
    period: ReportingPeriod,
    changes: &[ProposalChange],
    now: DateTime<Utc>,
) -> RecordResult<PathBuf> {
    let staged = stage_period_changes(data_dir, period, changes, now)?;
    staged.commit()?;
    Ok(staged.path)
}
