use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use httpmock::prelude::*;
use propwatch_core::{ProposalStatus, ReportingPeriod};
use propwatch_github_runtime::{
    run_sync, CommentFetcherConfig, CursorStateStore, FetchError, SyncError, SyncRuntimeConfig,
};
use propwatch_records::{load_period_changes, RecordStore};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::watch;

const COMMENTS_PATH: &str = "/repos/golang/go/issues/33502/comments";

fn config(api_base: String, root: &Path, summaries_dir: Option<PathBuf>) -> SyncRuntimeConfig {
    SyncRuntimeConfig {
        github_api_base: api_base,
        github_token: "test-token".to_string(),
        repo_slug: "golang/go".to_string(),
        fetcher: CommentFetcherConfig::default(),
        request_timeout_ms: Some(5_000),
        data_dir: root.join("data"),
        state_path: root.join("data").join("state.json"),
        summaries_dir,
    }
}

fn minutes_comment(id: u64, created_at: DateTime<Utc>, entries: &[(u64, &str, &str)]) -> Value {
    let mut body = format!("**{}** / **@rsc, @aclements**\n\n", created_at.date_naive());
    for (issue, title, status) in entries {
        body.push_str(&format!(
            "- [#{issue}](https://github.com/golang/go/issues/{issue}) **{title}**\n  - **{status}**\n"
        ));
    }
    json!({
        "id": id,
        "body": body,
        "created_at": created_at.to_rfc3339(),
        "updated_at": created_at.to_rfc3339(),
        "html_url": format!("https://github.com/golang/go/issues/33502#issuecomment-{id}"),
    })
}

fn serve_comments(server: &MockServer, comments: Vec<Value>) {
    server.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(200).json_body(Value::Array(comments));
    });
}

fn idle_cancel() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    drop(cancel_tx);
    cancel_rx
}

fn snapshot_dir(root: &Path) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let content = fs::read_to_string(&path).expect("read snapshot file");
                files.push((path, content));
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn integration_rerun_against_unchanged_remote_changes_nothing() {
    let temp = tempdir().expect("tempdir");
    let server = MockServer::start();
    let posted = Utc::now() - Duration::hours(2);
    serve_comments(
        &server,
        vec![minutes_comment(
            7001,
            posted,
            &[
                (61405, "spec: add range over int", "accepted"),
                (62483, "os: add Root type", "likely accept"),
            ],
        )],
    );
    let config = config(server.base_url(), temp.path(), None);

    let first = run_sync(&config, idle_cancel()).await.expect("first sync");
    assert_eq!(first.changes, 2);
    assert_eq!(first.records_written, 2);
    assert!(first.cursor_advanced);
    let before = snapshot_dir(temp.path());

    let second = run_sync(&config, idle_cancel()).await.expect("second sync");
    assert_eq!(second.changes, 0);
    assert_eq!(second.records_written, 0);
    assert!(!second.cursor_advanced);
    assert_eq!(snapshot_dir(temp.path()), before);
}

#[tokio::test]
async fn integration_rate_limited_run_leaves_state_byte_identical() {
    let temp = tempdir().expect("tempdir");
    let healthy = MockServer::start();
    serve_comments(
        &healthy,
        vec![minutes_comment(
            7101,
            Utc::now() - Duration::hours(1),
            &[(50001, "proposal: first item", "declined")],
        )],
    );
    run_sync(&config(healthy.base_url(), temp.path(), None), idle_cancel())
        .await
        .expect("seed sync");
    let state_path = temp.path().join("data").join("state.json");
    let state_before = fs::read(&state_path).expect("state");

    let limited = MockServer::start();
    let limited_mock = limited.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(429).header("retry-after", "60").body("rate limited");
    });
    let error = run_sync(&config(limited.base_url(), temp.path(), None), idle_cancel())
        .await
        .expect_err("rate limited");

    limited_mock.assert_calls(1);
    assert!(matches!(
        error,
        SyncError::Fetch(FetchError::RateLimited { status: 429, .. })
    ));
    assert_eq!(error.exit_code(), 2);
    assert_eq!(fs::read(&state_path).expect("state"), state_before);
}

#[tokio::test]
async fn integration_issue_number_past_storable_range_does_not_wedge_sync() {
    let temp = tempdir().expect("tempdir");
    let server = MockServer::start();
    let posted = Utc::now() - Duration::hours(1);
    serve_comments(
        &server,
        vec![minutes_comment(
            7201,
            posted,
            &[
                (10_000_000_000_000_000_000, "proposal: huge", "accepted"),
                (5, "proposal: small", "declined"),
            ],
        )],
    );
    let config = config(server.base_url(), temp.path(), None);

    let report = run_sync(&config, idle_cancel()).await.expect("sync");
    assert_eq!(report.changes, 1);
    assert_eq!(report.records_written, 1);
    assert!(report.cursor_advanced);
    let store = RecordStore::new(temp.path().join("data"));
    let period = ReportingPeriod::from_timestamp(posted);
    assert!(store.load_record(period, 5).expect("load").is_some());
    let cursor = CursorStateStore::new(temp.path().join("data").join("state.json"))
        .load_state()
        .expect("state")
        .expect("cursor");
    assert_eq!(cursor.last_comment_id, 7201);
}

#[tokio::test]
async fn integration_status_carries_over_between_weekly_runs() {
    let temp = tempdir().expect("tempdir");
    let first_week = Utc::now() + Duration::days(7);
    let second_week = first_week + Duration::days(7);

    let week_one = MockServer::start();
    serve_comments(
        &week_one,
        vec![minutes_comment(
            8001,
            first_week,
            &[(70001, "proposal: add iterator helpers", "likely accept")],
        )],
    );
    run_sync(&config(week_one.base_url(), temp.path(), None), idle_cancel())
        .await
        .expect("week one");

    let week_two = MockServer::start();
    serve_comments(
        &week_two,
        vec![
            minutes_comment(
                8002,
                second_week,
                &[(70001, "proposal: add iterator helpers", "accepted")],
            ),
            minutes_comment(
                8001,
                first_week,
                &[(70001, "proposal: add iterator helpers", "likely accept")],
            ),
        ],
    );
    let report = run_sync(&config(week_two.base_url(), temp.path(), None), idle_cancel())
        .await
        .expect("week two");
    assert_eq!(report.changes, 1);

    let store = RecordStore::new(temp.path().join("data"));
    let record = store
        .load_record(ReportingPeriod::from_timestamp(second_week), 70001)
        .expect("load")
        .expect("record");
    assert_eq!(record.previous_status, ProposalStatus::LikelyAccept);
    assert!(!record.previous_status_inferred);
    assert_eq!(record.current_status, ProposalStatus::Accepted);
    assert!(record.summary.contains("from likely_accept to accepted"));

    let cursor = CursorStateStore::new(temp.path().join("data").join("state.json"))
        .load_state()
        .expect("state")
        .expect("cursor");
    assert_eq!(cursor.last_comment_id, 8002);
}

#[tokio::test]
async fn integration_every_record_has_summary_text_after_sync() {
    let temp = tempdir().expect("tempdir");
    let summaries_dir = temp.path().join("summaries");
    fs::create_dir_all(&summaries_dir).expect("summaries dir");
    fs::write(
        summaries_dir.join("90001.md"),
        "The committee accepted the change; see [#90100](https://github.com/golang/go/issues/90100) for the follow-up.",
    )
    .expect("summary");
    let server = MockServer::start();
    let posted = Utc::now() - Duration::minutes(30);
    serve_comments(
        &server,
        vec![minutes_comment(
            9001,
            posted,
            &[
                (90001, "proposal: summarized", "accepted"),
                (90002, "proposal: unsummarized", "put on hold"),
            ],
        )],
    );

    let report = run_sync(
        &config(server.base_url(), temp.path(), Some(summaries_dir)),
        idle_cancel(),
    )
    .await
    .expect("sync");
    assert_eq!(report.summaries_integrated, 1);
    assert_eq!(report.fallback_applied, 1);

    let period = ReportingPeriod::from_timestamp(posted);
    let listing = RecordStore::new(temp.path().join("data"))
        .list_period(period)
        .expect("listing");
    assert!(listing.failures.is_empty());
    assert_eq!(listing.records.len(), 2);
    for record in &listing.records {
        assert!(!record.summary.trim().is_empty());
        let self_links = record
            .links
            .iter()
            .filter(|link| link.url == record.issue_url())
            .count();
        assert_eq!(self_links, 1);
    }
    let summarized = listing
        .records
        .iter()
        .find(|record| record.issue_number == 90001)
        .expect("summarized record");
    assert!(!summarized.summary_generated);
    assert!(summarized
        .links
        .iter()
        .any(|link| link.url == "https://github.com/golang/go/issues/90100"));

    let changes = load_period_changes(&temp.path().join("data"), period)
        .expect("change log")
        .expect("present");
    assert_eq!(changes.changes.len(), 2);
}

#[tokio::test]
async fn integration_cancelled_sync_writes_nothing() {
    let temp = tempdir().expect("tempdir");
    let server = MockServer::start();
    let comments = server.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(200).json_body(json!([]));
    });
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).expect("cancel");

    let error = run_sync(&config(server.base_url(), temp.path(), None), cancel_rx)
        .await
        .expect_err("cancelled");

    assert!(matches!(error, SyncError::Cancelled));
    assert_eq!(error.exit_code(), 130);
    comments.assert_calls(0);
    assert!(snapshot_dir(temp.path()).is_empty());
}
