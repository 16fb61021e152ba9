//! Shared model and low-level utilities for the proposal minutes tracker.
//!
//! Defines the proposal status vocabulary, extracted change records, the
//! processing cursor and ISO-week reporting periods, plus atomic file-write
//! and time helpers used by the state and record stores.

pub mod atomic_io;
pub mod cursor;
pub mod proposal;
pub mod reporting_period;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use cursor::Cursor;
pub use proposal::{
    is_valid_issue_number, ProposalChange, ProposalStatus, RecordLink, UnknownStatusError,
    MAX_ISSUE_NUMBER,
};
pub use reporting_period::{InvalidPeriodError, ReportingPeriod};
pub use time_utils::{current_unix_timestamp_ms, monotonic_after, parse_rfc3339_utc};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_monotonic_after_never_moves_backwards() {
        let earlier = parse_rfc3339_utc("2026-01-01T00:00:00Z").expect("earlier");
        let later = parse_rfc3339_utc("2026-01-02T00:00:00+00:00").expect("later");
        assert_eq!(monotonic_after(Some(later), earlier), later);
        assert_eq!(monotonic_after(Some(earlier), later), later);
        assert_eq!(monotonic_after(None, earlier), earlier);
    }

    #[test]
    fn unit_parse_rfc3339_utc_normalizes_offsets() {
        let parsed = parse_rfc3339_utc("2026-01-30T13:00:00+01:00").expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2026-01-30T12:00:00+00:00");
        assert!(parse_rfc3339_utc("yesterday").is_none());
    }
}
