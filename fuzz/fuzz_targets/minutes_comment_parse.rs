#![no_main]

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use propwatch_minutes::parse_minutes_comment;

const COMMENT_URL: &str = "https://github.com/golang/go/issues/33502#issuecomment-1";

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let Some(timestamp) = Utc.timestamp_opt(1_769_760_000, 0).single() else {
        return;
    };
    let changes = parse_minutes_comment(&raw, timestamp, COMMENT_URL);

    let mut seen = BTreeSet::new();
    for change in &changes {
        assert!(change.issue_number > 0);
        assert!(seen.insert(change.issue_number), "duplicate issue in one comment");
        assert!(change.previous_status.is_none());
        assert!(!change.related_issue_numbers.contains(&change.issue_number));
        assert_eq!(change.comment_url, COMMENT_URL);
    }
});
