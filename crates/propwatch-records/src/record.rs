//! Durable per-period proposal record.

use chrono::{DateTime, Utc};
use propwatch_core::{ProposalStatus, RecordLink, ReportingPeriod};

pub const PROPOSAL_ISSUE_LINK_TITLE: &str = "Proposal issue";
pub const REVIEW_MINUTES_LINK_TITLE: &str = "Review minutes";
const DEFAULT_REPOSITORY_HTML_BASE: &str = "https://github.com/golang/go";

/// File-resident form of a proposal's state within one reporting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProposalRecord {
    pub issue_number: u64,
    pub title: String,
    pub previous_status: ProposalStatus,
    /// `previous_status` is the `discussions` placeholder, not an observed status.
    pub previous_status_inferred: bool,
    pub current_status: ProposalStatus,
    pub changed_at: DateTime<Utc>,
    pub comment_url: String,
    pub links: Vec<RecordLink>,
    pub summary: String,
    /// `summary` was synthesized by the fallback rather than supplied externally.
    pub summary_generated: bool,
}

impl PersistedProposalRecord {
    pub fn period(&self) -> ReportingPeriod {
        ReportingPeriod::from_timestamp(self.changed_at)
    }

    pub fn issue_url(&self) -> String {
        issue_html_url(&self.comment_url, self.issue_number)
    }

    /// Appends `link` unless a link with the same URL is already present.
    pub fn push_link(&mut self, link: RecordLink) -> bool {
        if self.links.iter().any(|existing| existing.url == link.url) {
            return false;
        }
        self.links.push(link);
        true
    }
}

/// Builds the web URL of `issue_number` in the repository `comment_url` points into.
///
/// Falls back to the Go repository when the comment URL has no `/issues/` path.
pub fn issue_html_url(comment_url: &str, issue_number: u64) -> String {
    let base = comment_url
        .find("/issues/")
        .map(|index| &comment_url[..index])
        .filter(|base| !base.is_empty())
        .unwrap_or(DEFAULT_REPOSITORY_HTML_BASE);
    format!("{base}/issues/{issue_number}")
}

/// Deduplicates `links` by URL in first-seen order, with exactly one self link first.
pub fn normalize_links(
    issue_url: &str,
    links: impl IntoIterator<Item = RecordLink>,
) -> Vec<RecordLink> {
    let mut normalized = vec![RecordLink::new(PROPOSAL_ISSUE_LINK_TITLE, issue_url)];
    for link in links {
        if link.url.trim().is_empty() || normalized.iter().any(|seen| seen.url == link.url) {
            continue;
        }
        normalized.push(link);
    }
    normalized
}
