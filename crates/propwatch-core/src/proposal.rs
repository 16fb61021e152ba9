//! Proposal status vocabulary and the change record produced by extraction.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reporting_period::ReportingPeriod;

/// Review states a tracked proposal can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Discussions,
    Active,
    Hold,
    LikelyAccept,
    LikelyDecline,
    Accepted,
    Declined,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 7] = [
        Self::Discussions,
        Self::Active,
        Self::Hold,
        Self::LikelyAccept,
        Self::LikelyDecline,
        Self::Accepted,
        Self::Declined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discussions => "discussions",
            Self::Active => "active",
            Self::Hold => "hold",
            Self::LikelyAccept => "likely_accept",
            Self::LikelyDecline => "likely_decline",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown proposal status '{0}'")]
pub struct UnknownStatusError(pub String);

impl FromStr for ProposalStatus {
    type Err = UnknownStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatusError(raw.to_string()))
    }
}

/// Largest issue number a persisted record can carry; record front matter
/// stores integers as signed 64-bit values.
pub const MAX_ISSUE_NUMBER: u64 = i64::MAX as u64;

/// Whether `number` can name a tracked issue end to end.
pub fn is_valid_issue_number(number: u64) -> bool {
    (1..=MAX_ISSUE_NUMBER).contains(&number)
}

/// A titled URL attached to a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLink {
    pub title: String,
    pub url: String,
}

impl RecordLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// One observed status transition for one proposal issue.
///
/// Values are treated as immutable snapshots: enrichment goes through
/// [`ProposalChange::with_previous_status`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalChange {
    pub issue_number: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<ProposalStatus>,
    pub current_status: ProposalStatus,
    pub changed_at: DateTime<Utc>,
    pub comment_url: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub related_issue_numbers: BTreeSet<u64>,
}

impl ProposalChange {
    pub fn period(&self) -> ReportingPeriod {
        ReportingPeriod::from_timestamp(self.changed_at)
    }

    pub fn with_previous_status(&self, previous_status: ProposalStatus) -> Self {
        Self {
            previous_status: Some(previous_status),
            ..self.clone()
        }
    }
}
