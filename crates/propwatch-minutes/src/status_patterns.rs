//! Ordered phrase table mapping minutes wording to proposal statuses.
//!
//! Rows are evaluated top to bottom and the first match wins, so more
//! specific phrasings must precede the generic ones they contain
//! (`likely accept` before `accepted`).

use std::sync::OnceLock;

use propwatch_core::ProposalStatus;
use regex::Regex;

/// One row of the status table: a case-insensitive regex and its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPattern {
    pub pattern: &'static str,
    pub status: ProposalStatus,
}

/// There is intentionally no row for `ProposalStatus::Active`; entries whose
/// only wording is "added to minutes", "discussion ongoing" and similar are
/// skipped rather than guessed.
pub const STATUS_PATTERNS: &[StatusPattern] = &[
    StatusPattern {
        pattern: r"\blikely\s+accept",
        status: ProposalStatus::LikelyAccept,
    },
    StatusPattern {
        pattern: r"\blikely\s+decline",
        status: ProposalStatus::LikelyDecline,
    },
    StatusPattern {
        pattern: r"\b(?:put\s+)?on\s+hold\b",
        status: ProposalStatus::Hold,
    },
    StatusPattern {
        pattern: r"\b(?:moved|converted)\s+to\s+(?:a\s+)?discussions?\b",
        status: ProposalStatus::Discussions,
    },
    StatusPattern {
        pattern: r"\baccepted\b",
        status: ProposalStatus::Accepted,
    },
    StatusPattern {
        pattern: r"\b(?:declined|retracted|withdrawn)\b",
        status: ProposalStatus::Declined,
    },
];

fn compiled_patterns() -> &'static [(Regex, ProposalStatus)] {
    static COMPILED: OnceLock<Vec<(Regex, ProposalStatus)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        STATUS_PATTERNS
            .iter()
            .map(|row| {
                let regex = Regex::new(&format!("(?i){}", row.pattern))
                    .expect("status pattern regex compiles");
                (regex, row.status)
            })
            .collect()
    })
}

/// Returns the status of the first table row that matches `text`.
pub fn classify_status(text: &str) -> Option<ProposalStatus> {
    compiled_patterns()
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, status)| *status)
}
