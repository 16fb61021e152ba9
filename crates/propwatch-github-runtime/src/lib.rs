//! GitHub-facing runtime for the proposal minutes tracker.
//!
//! Owns the cursor state file, the REST client for the minutes issue, the
//! incremental comment fetcher, and the sync pass that writes records before
//! advancing the cursor.

pub mod comment_fetcher;
pub mod fetch_error;
pub mod github_api_client;
pub mod state_store;
pub mod sync_runtime;

pub use comment_fetcher::{
    wait_for_cancel, CommentFetcher, CommentFetcherConfig, FetchOutcome, DEFAULT_MAX_PAGES,
    DEFAULT_MINUTES_ISSUE, DEFAULT_PER_PAGE,
};
pub use fetch_error::{classify_http_failure, FetchError, RateLimitHeaders};
pub use github_api_client::{
    GithubApiClient, GithubIssueComment, GithubUser, RepoRef, GITHUB_ACCEPT_MEDIA_TYPE,
    GITHUB_API_VERSION, GITHUB_MAX_PER_PAGE,
};
pub use state_store::{CursorStateStore, StorageError, CURSOR_STATE_SCHEMA_VERSION};
pub use sync_runtime::{
    reconcile_changes, run_integrate_summaries, run_sync, IntegrateReport, ReconcilePlan,
    SyncError, SyncReport, SyncRuntimeConfig, EXIT_CODE_CANCELLED, EXIT_CODE_FAILURE,
    EXIT_CODE_FORBIDDEN, EXIT_CODE_RATE_LIMITED, EXIT_CODE_SERVER_ERROR,
};
