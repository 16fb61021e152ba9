//! Incremental retrieval of minutes comments and extraction of their changes.

use chrono::{DateTime, Utc};
use propwatch_core::{monotonic_after, Cursor, ProposalChange};
use propwatch_minutes::parse_minutes_comment;
use tokio::sync::watch;

use crate::fetch_error::FetchError;
use crate::github_api_client::{GithubApiClient, GithubIssueComment, GITHUB_MAX_PER_PAGE};

pub const DEFAULT_MINUTES_ISSUE: u64 = 33502;
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentFetcherConfig {
    pub minutes_issue: u64,
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for CommentFetcherConfig {
    fn default() -> Self {
        Self {
            minutes_issue: DEFAULT_MINUTES_ISSUE,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Result of one fetch pass. Nothing here has been persisted yet.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Extracted changes, ascending by `changed_at`.
    pub changes: Vec<ProposalChange>,
    pub processed_comment_ids: Vec<u64>,
    /// Cursor to persist once the changes are durable; `None` when no new
    /// comment was seen.
    pub next_cursor: Option<Cursor>,
    pub requests_made: u32,
    pub fresh_start: bool,
}

pub struct CommentFetcher {
    client: GithubApiClient,
    config: CommentFetcherConfig,
}

impl CommentFetcher {
    pub fn new(client: GithubApiClient, config: CommentFetcherConfig) -> Self {
        Self { client, config }
    }

    /// Fetches comments newer than `cursor` and extracts their changes.
    ///
    /// Without a cursor only the newest comment is considered. Every request
    /// races against `cancel_rx`.
    pub async fn fetch_changes(
        &self,
        cursor: Option<&Cursor>,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> Result<FetchOutcome, FetchError> {
        self.fetch_changes_at(cursor, Utc::now(), cancel_rx).await
    }

    pub async fn fetch_changes_at(
        &self,
        cursor: Option<&Cursor>,
        now: DateTime<Utc>,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> Result<FetchOutcome, FetchError> {
        let mut requests_made = 0_u32;
        let mut candidates = match cursor {
            None => {
                let newest = self.fetch_page(1, 1, cancel_rx).await?;
                requests_made += 1;
                newest.into_iter().take(1).collect::<Vec<_>>()
            }
            Some(cursor) => {
                self.collect_since(cursor, cancel_rx, &mut requests_made)
                    .await?
            }
        };
        candidates.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        candidates.dedup_by_key(|comment| comment.id);

        let slug = self.client.repo().as_slug();
        let mut changes = Vec::new();
        let mut processed_comment_ids = Vec::with_capacity(candidates.len());
        for comment in &candidates {
            let comment_url = comment_permalink(comment, &slug, self.config.minutes_issue);
            let extracted = parse_minutes_comment(
                comment.body.as_deref().unwrap_or_default(),
                comment.created_at,
                &comment_url,
            );
            tracing::debug!(
                comment_id = comment.id,
                changes = extracted.len(),
                "processed minutes comment"
            );
            changes.extend(extracted);
            processed_comment_ids.push(comment.id);
        }
        changes.sort_by_key(|change| change.changed_at);

        let next_cursor = processed_comment_ids.last().map(|newest_id| Cursor {
            last_comment_id: *newest_id,
            last_processed_at: monotonic_after(
                cursor.map(|cursor| cursor.last_processed_at),
                now,
            ),
        });
        tracing::info!(
            comments = processed_comment_ids.len(),
            changes = changes.len(),
            requests = requests_made,
            fresh_start = cursor.is_none(),
            "fetched minutes comments"
        );
        Ok(FetchOutcome {
            changes,
            processed_comment_ids,
            next_cursor,
            requests_made,
            fresh_start: cursor.is_none(),
        })
    }

    async fn collect_since(
        &self,
        cursor: &Cursor,
        cancel_rx: &mut watch::Receiver<bool>,
        requests_made: &mut u32,
    ) -> Result<Vec<GithubIssueComment>, FetchError> {
        let per_page = self.config.per_page.clamp(1, GITHUB_MAX_PER_PAGE);
        let max_pages = self.config.max_pages.max(1);
        let mut candidates = Vec::new();
        let mut reached_boundary = false;
        for page in 1..=max_pages {
            let comments = self.fetch_page(page, per_page, cancel_rx).await?;
            *requests_made += 1;
            let page_len = comments.len();
            let contains_last = comments
                .iter()
                .any(|comment| comment.id == cursor.last_comment_id);
            let all_seen = comments
                .iter()
                .all(|comment| comment.created_at <= cursor.last_processed_at);
            candidates.extend(comments.into_iter().filter(|comment| {
                comment.id != cursor.last_comment_id
                    && comment.created_at >= cursor.last_processed_at
            }));
            if contains_last || all_seen || page_len < per_page as usize {
                reached_boundary = true;
                break;
            }
        }
        if !reached_boundary {
            tracing::warn!(
                max_pages,
                per_page,
                "stopped paging at max_pages before reaching the cursor"
            );
        }
        Ok(candidates)
    }

    async fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> Result<Vec<GithubIssueComment>, FetchError> {
        if *cancel_rx.borrow() {
            return Err(FetchError::Cancelled);
        }
        tokio::select! {
            result = self.client.list_issue_comments_page(self.config.minutes_issue, page, per_page) => result,
            _ = wait_for_cancel(cancel_rx) => {
                tracing::warn!(page, "github fetch cancelled");
                Err(FetchError::Cancelled)
            }
        }
    }
}

/// Resolves once cancellation is requested. A dropped sender never cancels.
pub async fn wait_for_cancel(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow_and_update() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn comment_permalink(comment: &GithubIssueComment, repo_slug: &str, minutes_issue: u64) -> String {
    if comment.html_url.trim().is_empty() {
        format!(
            "https://github.com/{repo_slug}/issues/{minutes_issue}#issuecomment-{}",
            comment.id
        )
    } else {
        comment.html_url.trim().to_string()
    }
}
