//! Reconciliation of extracted changes into persisted records.
//!
//! `merge` is a pure function over snapshots; `integrate_summaries` and
//! `apply_fallback` update a period's records in place before they are
//! written.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use propwatch_core::{ProposalChange, ProposalStatus, RecordLink};
use regex::Regex;

use crate::record::{
    issue_html_url, normalize_links, PersistedProposalRecord, REVIEW_MINUTES_LINK_TITLE,
};

pub const SUMMARY_MIN_CHARS: usize = 200;
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Outcome of the soft summary length check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLengthCheck {
    pub valid: bool,
    pub reason: String,
}

fn change_links(change: &ProposalChange) -> Vec<RecordLink> {
    let mut links = Vec::new();
    if !change.comment_url.trim().is_empty() {
        links.push(RecordLink::new(
            REVIEW_MINUTES_LINK_TITLE,
            change.comment_url.clone(),
        ));
    }
    for related in &change.related_issue_numbers {
        links.push(RecordLink::new(
            format!("Issue #{related}"),
            issue_html_url(&change.comment_url, *related),
        ));
    }
    links
}

/// Folds `incoming` into the existing record for the same period and issue.
pub fn merge(
    existing: Option<&PersistedProposalRecord>,
    incoming: &ProposalChange,
) -> PersistedProposalRecord {
    let issue_url = issue_html_url(&incoming.comment_url, incoming.issue_number);
    let Some(existing) = existing else {
        return PersistedProposalRecord {
            issue_number: incoming.issue_number,
            title: incoming.title.clone(),
            previous_status: incoming
                .previous_status
                .unwrap_or(ProposalStatus::Discussions),
            previous_status_inferred: incoming.previous_status.is_none(),
            current_status: incoming.current_status,
            changed_at: incoming.changed_at,
            comment_url: incoming.comment_url.clone(),
            links: normalize_links(&issue_url, change_links(incoming)),
            summary: String::new(),
            summary_generated: false,
        };
    };

    // The start-of-period status sticks; only a placeholder yields to an observed one.
    let (previous_status, previous_status_inferred) =
        match (existing.previous_status_inferred, incoming.previous_status) {
            (true, Some(observed)) => (observed, false),
            _ => (existing.previous_status, existing.previous_status_inferred),
        };
    let title = if incoming.title.trim().is_empty() {
        existing.title.clone()
    } else {
        incoming.title.clone()
    };
    // Fallback text describes the old transition, so it is regenerated.
    let summary = if existing.summary_generated {
        String::new()
    } else {
        existing.summary.clone()
    };

    PersistedProposalRecord {
        issue_number: incoming.issue_number,
        title,
        previous_status,
        previous_status_inferred,
        current_status: incoming.current_status,
        changed_at: existing.changed_at.max(incoming.changed_at),
        comment_url: incoming.comment_url.clone(),
        links: normalize_links(
            &issue_url,
            existing
                .links
                .iter()
                .cloned()
                .chain(change_links(incoming)),
        ),
        summary,
        summary_generated: false,
    }
}

fn summary_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\((https?://[^)\s]+/issues/\d+(?:#issuecomment-\d+)?)\)")
            .expect("summary link regex compiles")
    })
}

/// Returns the issue and comment links cited in markdown summary text.
pub fn summary_links(text: &str) -> Vec<RecordLink> {
    summary_link_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let label = caps.get(1)?.as_str().trim();
            let url = caps.get(2)?.as_str();
            let title = if label.starts_with('#') {
                format!("Issue {label}")
            } else {
                label.to_string()
            };
            Some(RecordLink::new(title, url))
        })
        .collect()
}

/// Applies externally produced summaries, returning how many records changed.
pub fn integrate_summaries(
    records: &mut [PersistedProposalRecord],
    summaries: &BTreeMap<u64, String>,
) -> usize {
    let mut integrated = 0;
    for record in records.iter_mut() {
        let Some(text) = summaries
            .get(&record.issue_number)
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
        else {
            continue;
        };
        record.summary = text.to_string();
        record.summary_generated = false;
        for link in summary_links(text) {
            record.push_link(link);
        }
        let check = validate_summary_length(text);
        if !check.valid {
            tracing::warn!(
                issue_number = record.issue_number,
                reason = %check.reason,
                "summary length outside target window"
            );
        }
        integrated += 1;
    }
    integrated
}

/// Deterministic description built from a record's own fields.
pub fn fallback_summary(record: &PersistedProposalRecord) -> String {
    let subject = if record.title.trim().is_empty() {
        format!("Proposal #{}", record.issue_number)
    } else {
        format!("Proposal #{} ({})", record.issue_number, record.title.trim())
    };
    if record.previous_status == record.current_status {
        format!(
            "{subject} was reviewed this week and remains {}; it was {} at the start of the week.",
            record.current_status, record.previous_status
        )
    } else {
        format!(
            "{subject} moved from {} to {} in this week's proposal review.",
            record.previous_status, record.current_status
        )
    }
}

/// Fills every empty summary with fallback text, returning how many were filled.
pub fn apply_fallback(records: &mut [PersistedProposalRecord]) -> usize {
    let mut filled = 0;
    for record in records.iter_mut() {
        if !record.summary.trim().is_empty() {
            continue;
        }
        record.summary = fallback_summary(record);
        record.summary_generated = true;
        filled += 1;
    }
    filled
}

/// Flags summaries outside the 200-500 character window; never blocks them.
pub fn validate_summary_length(text: &str) -> SummaryLengthCheck {
    let length = text.trim().chars().count();
    if length < SUMMARY_MIN_CHARS {
        SummaryLengthCheck {
            valid: false,
            reason: format!(
                "summary has {length} characters, below the {SUMMARY_MIN_CHARS} character minimum; it may be truncated"
            ),
        }
    } else if length > SUMMARY_MAX_CHARS {
        SummaryLengthCheck {
            valid: false,
            reason: format!(
                "summary has {length} characters, above the {SUMMARY_MAX_CHARS} character maximum; it may be bloated"
            ),
        }
    } else {
        SummaryLengthCheck {
            valid: true,
            reason: format!("summary has {length} characters"),
        }
    }
}
