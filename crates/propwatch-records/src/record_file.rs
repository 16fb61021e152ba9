//! Markdown record files with TOML front matter.
//!
//! ```text
//! +++
//! issue_number = 12345
//! title = "proposal: add generics support"
//! previous_status = "likely_accept"
//! current_status = "accepted"
//! changed_at = "2026-01-30T18:00:00Z"
//! comment_url = "https://github.com/golang/go/issues/33502#issuecomment-900"
//!
//! [[related_links]]
//! title = "Proposal issue"
//! url = "https://github.com/golang/go/issues/12345"
//! +++
//!
//! Summary text.
//! ```

use std::path::Path;

use propwatch_core::{is_valid_issue_number, parse_rfc3339_utc, ProposalStatus, RecordLink};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::{normalize_links, PersistedProposalRecord};

const FRONT_MATTER_DELIMITER: &str = "+++";

#[derive(Serialize)]
struct FrontMatterOut<'a> {
    issue_number: u64,
    title: &'a str,
    previous_status: ProposalStatus,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    previous_status_inferred: bool,
    current_status: ProposalStatus,
    changed_at: String,
    comment_url: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    summary_generated: bool,
    related_links: &'a [RecordLink],
}

#[derive(Deserialize)]
struct FrontMatterIn {
    issue_number: Option<i64>,
    title: Option<String>,
    previous_status: Option<String>,
    #[serde(default)]
    previous_status_inferred: bool,
    current_status: Option<String>,
    changed_at: Option<String>,
    comment_url: Option<String>,
    #[serde(default)]
    summary_generated: bool,
    related_links: Option<Vec<RecordLink>>,
}

pub fn render_record_file(record: &PersistedProposalRecord) -> Result<String, toml::ser::Error> {
    let front_matter = toml::to_string(&FrontMatterOut {
        issue_number: record.issue_number,
        title: &record.title,
        previous_status: record.previous_status,
        previous_status_inferred: record.previous_status_inferred,
        current_status: record.current_status,
        changed_at: record.changed_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        comment_url: &record.comment_url,
        summary_generated: record.summary_generated,
        related_links: &record.links,
    })?;
    let mut rendered = String::new();
    rendered.push_str(FRONT_MATTER_DELIMITER);
    rendered.push('\n');
    rendered.push_str(&front_matter);
    if !front_matter.ends_with('\n') {
        rendered.push('\n');
    }
    rendered.push_str(FRONT_MATTER_DELIMITER);
    rendered.push('\n');
    let summary = record.summary.trim();
    if !summary.is_empty() {
        rendered.push('\n');
        rendered.push_str(summary);
        rendered.push('\n');
    }
    Ok(rendered)
}

fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start_matches('\u{feff}');
    let mut offset = 0;
    let mut front_start = None;
    for line in content.split_inclusive('\n') {
        let line_end = offset + line.len();
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            match front_start {
                None => front_start = Some(line_end),
                Some(start) => return Some((&content[start..offset], &content[line_end..])),
            }
        } else if front_start.is_none() && !line.trim().is_empty() {
            return None;
        }
        offset = line_end;
    }
    None
}

fn required<T>(path: &Path, field: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::new(path, format!("missing required field '{field}'")))
}

fn parse_status(path: &Path, field: &str, raw: &str) -> Result<ProposalStatus, ValidationError> {
    raw.parse::<ProposalStatus>()
        .map_err(|error| ValidationError::new(path, format!("field '{field}': {error}")))
}

/// Parses and validates a record file; any missing or malformed field rejects the file.
pub fn parse_record_file(
    path: &Path,
    content: &str,
) -> Result<PersistedProposalRecord, ValidationError> {
    let (front_matter, body) = split_front_matter(content)
        .ok_or_else(|| ValidationError::new(path, "missing +++ front matter block"))?;
    let raw: FrontMatterIn = toml::from_str(front_matter)
        .map_err(|error| ValidationError::new(path, format!("malformed front matter: {error}")))?;

    let issue_number = required(path, "issue_number", raw.issue_number)?;
    let issue_number = u64::try_from(issue_number)
        .ok()
        .filter(|number| is_valid_issue_number(*number))
        .ok_or_else(|| {
            ValidationError::new(path, format!("issue_number {issue_number} is out of range"))
        })?;
    let title = required(path, "title", raw.title)?;
    let previous_status = parse_status(
        path,
        "previous_status",
        &required(path, "previous_status", raw.previous_status)?,
    )?;
    let current_status = parse_status(
        path,
        "current_status",
        &required(path, "current_status", raw.current_status)?,
    )?;
    let changed_at_raw = required(path, "changed_at", raw.changed_at)?;
    let changed_at = parse_rfc3339_utc(&changed_at_raw).ok_or_else(|| {
        ValidationError::new(path, format!("unparsable changed_at '{changed_at_raw}'"))
    })?;
    let comment_url = required(path, "comment_url", raw.comment_url)?;
    if comment_url.trim().is_empty() {
        return Err(ValidationError::new(path, "comment_url is empty"));
    }
    let related_links = required(path, "related_links", raw.related_links)?;

    let mut record = PersistedProposalRecord {
        issue_number,
        title,
        previous_status,
        previous_status_inferred: raw.previous_status_inferred,
        current_status,
        changed_at,
        comment_url,
        links: Vec::new(),
        summary: body.trim().to_string(),
        summary_generated: raw.summary_generated,
    };
    record.links = normalize_links(&record.issue_url(), related_links);
    Ok(record)
}
