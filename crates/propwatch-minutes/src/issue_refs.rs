//! Issue reference scanning for minutes entries.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use propwatch_core::is_valid_issue_number;
use regex::Regex;

/// Issue number found on an entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueReference {
    Number(u64),
    /// A reference was present but its digits were zero or past the largest
    /// storable issue number.
    Malformed,
}

fn markdown_issue_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[#(\d+)\]\(([^)\s]*)\)").expect("markdown issue link regex compiles")
    })
}

fn issue_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/issues/(\d+)(?:#issuecomment-(\d+))?").expect("issue url regex compiles")
    })
}

fn issue_permalink_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<?https?://[^\s)>]*/issues/\d+(?:#issuecomment-\d+)?>?")
            .expect("issue permalink regex compiles")
    })
}

fn bare_issue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[\s(])#(\d+)\b").expect("bare issue regex compiles"))
}

fn parse_issue_digits(digits: &str) -> Option<u64> {
    digits
        .parse::<u64>()
        .ok()
        .filter(|number| is_valid_issue_number(*number))
}

/// Finds the issue an entry line is about.
///
/// Markdown issue links take precedence over issue URLs, which take
/// precedence over bare `#N` mentions.
pub fn entry_issue_reference(line: &str) -> Option<IssueReference> {
    let digits = markdown_issue_link_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .or_else(|| {
            issue_url_regex()
                .captures(line)
                .and_then(|caps| caps.get(1))
        })
        .or_else(|| {
            bare_issue_regex()
                .captures(line)
                .and_then(|caps| caps.get(1))
        })?;
    Some(match parse_issue_digits(digits.as_str()) {
        Some(number) => IssueReference::Number(number),
        None => IssueReference::Malformed,
    })
}

/// Collects issues cited through markdown issue links or comment permalinks,
/// excluding `self_number`.
pub fn related_issue_numbers(text: &str, self_number: u64) -> BTreeSet<u64> {
    let mut related = BTreeSet::new();
    for caps in markdown_issue_link_regex().captures_iter(text) {
        if let Some(number) = caps.get(1).and_then(|m| parse_issue_digits(m.as_str())) {
            related.insert(number);
        }
    }
    for caps in issue_url_regex().captures_iter(text) {
        if caps.get(2).is_none() {
            continue;
        }
        if let Some(number) = caps.get(1).and_then(|m| parse_issue_digits(m.as_str())) {
            related.insert(number);
        }
    }
    related.remove(&self_number);
    related
}

/// Removes issue links, issue URLs and bare issue mentions, leaving the
/// surrounding prose.
pub(crate) fn strip_issue_references(line: &str) -> String {
    let without_links = markdown_issue_link_regex().replace_all(line, " ");
    let without_urls = issue_permalink_regex().replace_all(&without_links, " ");
    bare_issue_regex()
        .replace_all(&without_urls, " ")
        .into_owned()
}
