use chrono::{DateTime, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Parses an RFC 3339 timestamp and normalizes it to UTC.
pub fn parse_rfc3339_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// Returns `candidate` unless it would move time backwards past `floor`.
pub fn monotonic_after(floor: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    match floor {
        Some(floor) if floor > candidate => floor,
        _ => candidate,
    }
}
