//! Classification of GitHub API failures.

use reqwest::header::HeaderMap;
use thiserror::Error;

const ERROR_BODY_MAX_CHARS: usize = 800;

/// Failure talking to the issue tracker. Every variant aborts the run and
/// leaves the cursor untouched; none are retried within a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("github api {operation} was rate limited (status {status}{}): {message}", retry_after_hint(.retry_after_seconds))]
    RateLimited {
        operation: String,
        status: u16,
        retry_after_seconds: Option<u64>,
        message: String,
    },
    #[error("github api {operation} was forbidden (status 403), check token permissions: {message}")]
    Forbidden { operation: String, message: String },
    #[error("github api {operation} hit a transient server error (status {status}): {message}")]
    ServerError {
        operation: String,
        status: u16,
        message: String,
    },
    #[error("github api {operation} failed with status {status}: {message}")]
    Http {
        operation: String,
        status: u16,
        message: String,
    },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode github {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("github fetch cancelled")]
    Cancelled,
    #[error("invalid github client configuration: {0}")]
    Config(String),
}

fn retry_after_hint(retry_after_seconds: &Option<u64>) -> String {
    retry_after_seconds
        .map(|seconds| format!(", retry after {seconds}s"))
        .unwrap_or_default()
}

impl FetchError {
    /// HTTP status for response-level failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. }
            | Self::ServerError { status, .. }
            | Self::Http { status, .. } => Some(*status),
            Self::Forbidden { .. } => Some(403),
            Self::Transport { source, .. } | Self::Decode { source, .. } => {
                source.status().map(|status| status.as_u16())
            }
            Self::Cancelled | Self::Config(_) => None,
        }
    }

    /// Stable label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Forbidden { .. } => "forbidden",
            Self::ServerError { .. } => "server_error",
            Self::Http { .. } => "http_error",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
        }
    }
}

/// Rate-limit signals carried by a GitHub response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub remaining: Option<u64>,
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
        };
        Self {
            remaining: parse("x-ratelimit-remaining"),
            retry_after_seconds: parse("retry-after"),
        }
    }

    pub fn signals_rate_limit(&self) -> bool {
        self.remaining == Some(0) || self.retry_after_seconds.is_some()
    }
}

pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut truncated = trimmed.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Maps a non-success response to its error class.
pub fn classify_http_failure(
    operation: &str,
    status: u16,
    rate_limit: RateLimitHeaders,
    body: &str,
) -> FetchError {
    let operation = operation.to_string();
    let message = truncate_for_error(body, ERROR_BODY_MAX_CHARS);
    match status {
        429 => FetchError::RateLimited {
            operation,
            status,
            retry_after_seconds: rate_limit.retry_after_seconds,
            message,
        },
        403 if rate_limit.signals_rate_limit() => FetchError::RateLimited {
            operation,
            status,
            retry_after_seconds: rate_limit.retry_after_seconds,
            message,
        },
        403 => FetchError::Forbidden { operation, message },
        500..=599 => FetchError::ServerError {
            operation,
            status,
            message,
        },
        _ => FetchError::Http {
            operation,
            status,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::*;

    #[test]
    fn unit_classify_http_failure_separates_rate_limit_from_forbidden() {
        let limited = classify_http_failure("list", 429, RateLimitHeaders::default(), "slow down");
        assert_eq!(limited.kind(), "rate_limited");
        assert_eq!(limited.status_code(), Some(429));

        let secondary = classify_http_failure(
            "list",
            403,
            RateLimitHeaders {
                remaining: Some(0),
                retry_after_seconds: None,
            },
            "",
        );
        assert_eq!(secondary.kind(), "rate_limited");

        let forbidden = classify_http_failure(
            "list",
            403,
            RateLimitHeaders {
                remaining: Some(12),
                retry_after_seconds: None,
            },
            "Resource not accessible by integration",
        );
        assert_eq!(forbidden.kind(), "forbidden");
        assert_eq!(forbidden.status_code(), Some(403));
    }

    #[test]
    fn unit_classify_http_failure_marks_server_errors_transient() {
        for status in [500, 502, 503] {
            let error = classify_http_failure("list", status, RateLimitHeaders::default(), "");
            assert_eq!(error.kind(), "server_error");
            assert_eq!(error.status_code(), Some(status));
        }
        let error = classify_http_failure("list", 404, RateLimitHeaders::default(), "Not Found");
        assert_eq!(error.kind(), "http_error");
        assert!(error.to_string().contains("status 404: Not Found"));
    }

    #[test]
    fn unit_rate_limit_headers_parse_remaining_and_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("retry-after", HeaderValue::from_static(" 60 "));
        let parsed = RateLimitHeaders::from_headers(&headers);
        assert_eq!(parsed.remaining, Some(0));
        assert_eq!(parsed.retry_after_seconds, Some(60));
        assert!(parsed.signals_rate_limit());
        assert!(!RateLimitHeaders::from_headers(&HeaderMap::new()).signals_rate_limit());
    }

    #[test]
    fn regression_rate_limited_message_includes_retry_hint() {
        let error = classify_http_failure(
            "list issue comments",
            429,
            RateLimitHeaders {
                remaining: None,
                retry_after_seconds: Some(30),
            },
            "",
        );
        assert!(error.to_string().contains("retry after 30s"));
    }

    #[test]
    fn unit_truncate_for_error_limits_characters() {
        assert_eq!(truncate_for_error("  short  ", 10), "short");
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
    }
}
