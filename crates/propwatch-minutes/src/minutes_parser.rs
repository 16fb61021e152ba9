//! Tolerant parser for weekly proposal review minutes comments.
//!
//! A minutes comment looks like:
//!
//! ```text
//! **2026-01-30** / **@rsc, @aclements**
//!
//! - [#12345](https://github.com/golang/go/issues/12345) **proposal: add generics support**
//!   - **accepted**
//! ```
//!
//! Every top-level bullet that names an issue opens an entry; the indented
//! lines below it carry the status wording. Anything that does not fit is
//! skipped, never reported as an error.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use propwatch_core::ProposalChange;
use regex::Regex;

use crate::issue_refs::{
    entry_issue_reference, related_issue_numbers, strip_issue_references, IssueReference,
};
use crate::status_patterns::classify_status;

/// Date/attendee line at the top of a minutes comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinutesHeader {
    pub date: NaiveDate,
    pub attendees: Vec<String>,
}

#[derive(Debug)]
struct EntryDraft<'a> {
    reference: IssueReference,
    header: &'a str,
    nested: Vec<&'a str>,
}

fn bold_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold span regex compiles"))
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\*\*(\d{4}-\d{2}-\d{2})\*\*\s*/\s*(.*)$").expect("header regex compiles")
    })
}

fn top_level_bullet(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

/// Parses the `**YYYY-MM-DD** / **@a, @b**` header from the first non-empty line.
pub fn parse_minutes_header(body: &str) -> Option<MinutesHeader> {
    let first = body.lines().map(str::trim).find(|line| !line.is_empty())?;
    let caps = header_regex().captures(first)?;
    let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
    let attendees = caps
        .get(2)
        .map(|m| m.as_str().replace("**", ""))
        .unwrap_or_default()
        .split(',')
        .map(|name| name.trim().trim_start_matches('@').to_string())
        .filter(|name| !name.is_empty())
        .collect();
    Some(MinutesHeader { date, attendees })
}

fn split_entries(body: &str) -> Vec<EntryDraft<'_>> {
    let mut entries = Vec::new();
    let mut current: Option<EntryDraft<'_>> = None;
    for line in body.lines() {
        let line = line.trim_end();
        if let Some(rest) = top_level_bullet(line) {
            entries.extend(current.take());
            current = entry_issue_reference(rest).map(|reference| EntryDraft {
                reference,
                header: rest,
                nested: Vec::new(),
            });
        } else if line.trim().is_empty() {
            continue;
        } else if line.starts_with([' ', '\t']) {
            if let Some(entry) = current.as_mut() {
                entry.nested.push(line.trim());
            }
        } else {
            // Unindented prose such as a section heading ends the entry.
            entries.extend(current.take());
        }
    }
    entries.extend(current);
    entries
}

fn entry_title(header: &str) -> String {
    if let Some(title) = bold_span_regex()
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|title| !title.is_empty())
    {
        return title.to_string();
    }
    strip_issue_references(header)
        .replace("**", "")
        .trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, '-' | ':' | ','))
        .to_string()
}

/// Extracts one change per recognized entry, in order of last appearance.
///
/// `previous_status` is always left empty; history is supplied later by
/// reconciliation.
pub fn parse_minutes_comment(
    body: &str,
    comment_timestamp: DateTime<Utc>,
    comment_url: &str,
) -> Vec<ProposalChange> {
    match parse_minutes_header(body) {
        Some(header) => tracing::debug!(
            date = %header.date,
            attendees = %header.attendees.join(","),
            comment_url,
            "parsing minutes comment"
        ),
        None => tracing::debug!(comment_url, "comment has no minutes header"),
    }
    let mut changes: Vec<ProposalChange> = Vec::new();
    for entry in split_entries(body) {
        let IssueReference::Number(issue_number) = entry.reference else {
            tracing::debug!(entry = entry.header, "skipping entry with malformed issue number");
            continue;
        };
        // The first nested line carrying status wording decides; later
        // lines are commentary.
        let Some(current_status) = entry.nested.iter().find_map(|line| classify_status(line))
        else {
            tracing::debug!(issue_number, "skipping entry without recognized status wording");
            continue;
        };
        let mut cited = String::from(entry.header);
        for line in &entry.nested {
            cited.push('\n');
            cited.push_str(line);
        }

        changes.retain(|change| change.issue_number != issue_number);
        changes.push(ProposalChange {
            issue_number,
            title: entry_title(entry.header),
            previous_status: None,
            current_status,
            changed_at: comment_timestamp,
            comment_url: comment_url.to_string(),
            related_issue_numbers: related_issue_numbers(&cited, issue_number),
        });
    }
    changes
}
