use std::path::Path;

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;

const COMMENTS_PATH: &str = "/repos/golang/go/issues/33502/comments";

const MINUTES_BODY: &str = "**2026-01-29** / **@rsc, @aclements**\n\n\
- [#61405](https://github.com/golang/go/issues/61405) **spec: add range over int**\n  \
- **accepted**\n\
- [#62483](https://github.com/golang/go/issues/62483) **os: add Root type**\n  \
- **likely accept**\n";

fn propwatch(data_dir: &Path, api_base: &str) -> Command {
    let mut command = Command::cargo_bin("propwatch").expect("binary");
    command
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--github-api-base")
        .arg(api_base);
    command
}

#[test]
fn integration_sync_then_status_and_list_report_written_records() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(200).json_body(json!([{
            "id": 4001,
            "body": MINUTES_BODY,
            "created_at": "2026-01-29T20:00:00Z",
            "updated_at": "2026-01-29T20:00:00Z",
            "html_url": "https://github.com/golang/go/issues/33502#issuecomment-4001"
        }]));
    });
    let temp = tempdir().expect("tempdir");

    propwatch(temp.path(), &server.base_url())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("changes=2"))
        .stdout(predicate::str::contains("cursor_advanced=true"));

    propwatch(temp.path(), &server.base_url())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("last_comment_id=4001"))
        .stdout(predicate::str::contains("2026-W05"));

    propwatch(temp.path(), &server.base_url())
        .args(["list", "--period", "2026-W05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#61405\tdiscussions -> accepted"))
        .stdout(predicate::str::contains("#62483\tdiscussions -> likely_accept"));
}

#[test]
fn regression_rate_limited_sync_exits_with_code_two_and_writes_nothing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(429).header("retry-after", "30").body("slow down");
    });
    let temp = tempdir().expect("tempdir");

    propwatch(temp.path(), &server.base_url())
        .arg("sync")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("rate limited"));

    assert!(!temp.path().join("state.json").exists());
    assert!(!temp.path().join("records").exists());
}

#[test]
fn regression_forbidden_sync_exits_with_code_three() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(COMMENTS_PATH);
        then.status(403).body("Resource not accessible by integration");
    });
    let temp = tempdir().expect("tempdir");

    propwatch(temp.path(), &server.base_url())
        .arg("sync")
        .assert()
        .code(3);
}

#[test]
fn functional_integrate_summaries_requires_summaries_dir() {
    let temp = tempdir().expect("tempdir");
    propwatch(temp.path(), "http://127.0.0.1:9")
        .arg("integrate-summaries")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--summaries-dir"));
}
