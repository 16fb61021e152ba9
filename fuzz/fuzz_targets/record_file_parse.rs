#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use propwatch_records::{parse_record_file, render_record_file};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let path = Path::new("records/2026-W05/1.md");
    let Ok(record) = parse_record_file(path, &raw) else {
        return;
    };
    assert!(record.issue_number > 0);
    assert!(!record.comment_url.trim().is_empty());
    let self_url = record.issue_url();
    assert_eq!(
        record.links.iter().filter(|link| link.url == self_url).count(),
        1
    );

    let rendered = render_record_file(&record).expect("valid record renders");
    let reparsed = parse_record_file(path, &rendered).expect("rendered record parses");
    assert_eq!(reparsed.issue_number, record.issue_number);
    assert_eq!(reparsed.current_status, record.current_status);
    assert_eq!(reparsed.links, record.links);
});
