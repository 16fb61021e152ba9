use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::fetch_error::{classify_http_failure, FetchError, RateLimitHeaders};

pub const GITHUB_ACCEPT_MEDIA_TYPE: &str = "application/vnd.github+json";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const GITHUB_MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::Config(format!("invalid repository '{raw}', expected owner/repo"));
        let trimmed = raw.trim();
        let (owner, name) = trimmed.split_once('/').ok_or_else(invalid)?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Author of a GitHub issue comment.
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue comment as returned by the GitHub REST API.
pub struct GithubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<GithubUser>,
}

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubApiClient {
    /// Builds a client with the fixed GitHub media type and API version headers.
    ///
    /// An empty token sends unauthenticated requests. Without
    /// `request_timeout_ms` the transport's default applies.
    pub fn new(
        api_base: String,
        token: String,
        repo: RepoRef,
        request_timeout_ms: Option<u64>,
    ) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("propwatch-minutes-tracker"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(GITHUB_ACCEPT_MEDIA_TYPE),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let token = token.trim();
        if !token.is_empty() {
            let mut auth_header =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(
                    |_| FetchError::Config("invalid github authorization header".to_string()),
                )?;
            auth_header.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, auth_header);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout_ms) = request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms.max(1)));
        }
        let http = builder
            .build()
            .map_err(|error| FetchError::Config(format!("failed to create github client: {error}")))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Fetches one page of an issue's comments, newest first.
    pub async fn list_issue_comments_page(
        &self,
        issue_number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GithubIssueComment>, FetchError> {
        let page_value = page.max(1).to_string();
        let per_page_value = per_page.clamp(1, GITHUB_MAX_PER_PAGE).to_string();
        let request = self
            .http
            .get(format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.api_base, self.repo.owner, self.repo.name, issue_number
            ))
            .query(&[
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", per_page_value.as_str()),
                ("page", page_value.as_str()),
            ]);
        let mut comments: Vec<GithubIssueComment> =
            self.request_json("list issue comments", request).await?;
        comments.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(comments)
    }

    async fn request_json<T>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|source| {
            let error = FetchError::Transport {
                operation: operation.to_string(),
                source,
            };
            log_fetch_error(&error);
            error
        })?;
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|source| {
                let error = FetchError::Decode {
                    operation: operation.to_string(),
                    source,
                };
                log_fetch_error(&error);
                error
            });
        }

        let rate_limit = RateLimitHeaders::from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();
        let error = classify_http_failure(operation, status.as_u16(), rate_limit, &body);
        log_fetch_error(&error);
        Err(error)
    }
}

fn log_fetch_error(error: &FetchError) {
    match error {
        FetchError::RateLimited {
            status,
            retry_after_seconds,
            ..
        } => tracing::error!(
            error_kind = error.kind(),
            status,
            retry_after_seconds = retry_after_seconds.unwrap_or_default(),
            "github rate limit reached; leaving cursor for the next scheduled run"
        ),
        FetchError::Forbidden { .. } => tracing::error!(
            error_kind = error.kind(),
            status = 403,
            "github denied access; check token permissions"
        ),
        FetchError::ServerError { status, .. } => tracing::error!(
            error_kind = error.kind(),
            status,
            "github server error; treating as a transient outage"
        ),
        _ => tracing::error!(
            error_kind = error.kind(),
            status = error.status_code().unwrap_or_default(),
            error = %error,
            "github request failed"
        ),
    }
}
