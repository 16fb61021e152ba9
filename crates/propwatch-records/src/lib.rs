//! Change reconciliation and per-period persistence.
//!
//! Merges extracted [`propwatch_core::ProposalChange`] values into durable
//! per-week record files, folds in externally written summaries, and
//! guarantees every record carries human-readable text through a
//! deterministic fallback.

pub mod change_log;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod record_file;
pub mod record_store;
pub mod staged_write;
pub mod summary_inputs;

pub use change_log::{
    change_log_path, load_period_changes, stage_period_changes, write_period_changes,
    PeriodChangeLog,
};
pub use error::{RecordError, RecordResult, ValidationError};
pub use reconcile::{
    apply_fallback, fallback_summary, integrate_summaries, merge, summary_links,
    validate_summary_length, SummaryLengthCheck, SUMMARY_MAX_CHARS, SUMMARY_MIN_CHARS,
};
pub use record::{
    issue_html_url, normalize_links, PersistedProposalRecord, PROPOSAL_ISSUE_LINK_TITLE,
    REVIEW_MINUTES_LINK_TITLE,
};
pub use record_file::{parse_record_file, render_record_file};
pub use record_store::{PeriodListing, RecordStore};
pub use staged_write::StagedWrite;
pub use summary_inputs::load_summary_inputs;
