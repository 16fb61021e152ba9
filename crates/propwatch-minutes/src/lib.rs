//! Minutes extraction: turns free-form proposal review minutes into
//! structured [`propwatch_core::ProposalChange`] records.

pub mod issue_refs;
pub mod minutes_parser;
pub mod status_patterns;

pub use issue_refs::{entry_issue_reference, related_issue_numbers, IssueReference};
pub use minutes_parser::{parse_minutes_comment, parse_minutes_header, MinutesHeader};
pub use status_patterns::{classify_status, StatusPattern, STATUS_PATTERNS};
