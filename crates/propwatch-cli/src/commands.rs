use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use propwatch_core::ReportingPeriod;
use propwatch_github_runtime::{
    run_integrate_summaries, run_sync, CommentFetcherConfig, CursorStateStore, SyncRuntimeConfig,
};
use propwatch_records::RecordStore;
use tokio::sync::watch;

use crate::cli_args::{Cli, CliCommand};

pub(crate) async fn run_cli(cli: Cli, cancel_rx: watch::Receiver<bool>) -> Result<()> {
    let mut stdout = std::io::stdout();
    match &cli.command {
        CliCommand::Sync => {
            let config = sync_config(&cli);
            let report = run_sync(&config, cancel_rx).await?;
            writeln!(
                stdout,
                "sync: comments={} changes={} records_written={} periods={} cursor_advanced={} requests={}",
                report.comments_processed,
                report.changes,
                report.records_written,
                join_periods(&report.periods),
                report.cursor_advanced,
                report.requests_made,
            )?;
        }
        CliCommand::IntegrateSummaries { period } => {
            let summaries_dir = cli
                .summaries_dir
                .as_deref()
                .ok_or_else(|| anyhow!("integrate-summaries requires --summaries-dir"))?;
            let report = run_integrate_summaries(&cli.data_dir, *period, summaries_dir)?;
            match report.period {
                Some(period) => writeln!(
                    stdout,
                    "integrate-summaries: period={period} records={} summaries={} fallback={} failures={}",
                    report.records,
                    report.summaries_integrated,
                    report.fallback_applied,
                    report.failures,
                )?,
                None => writeln!(stdout, "integrate-summaries: no records")?,
            }
        }
        CliCommand::List { period } => list_records(&mut stdout, &cli.data_dir, *period)?,
        CliCommand::Status => print_status(&mut stdout, &cli)?,
    }
    Ok(())
}

pub(crate) fn sync_config(cli: &Cli) -> SyncRuntimeConfig {
    SyncRuntimeConfig {
        github_api_base: cli.github_api_base.clone(),
        github_token: cli.github_token.clone().unwrap_or_default(),
        repo_slug: cli.github_repo.clone(),
        fetcher: CommentFetcherConfig {
            minutes_issue: cli.minutes_issue,
            per_page: cli.per_page,
            max_pages: cli.max_pages,
        },
        request_timeout_ms: cli.request_timeout_ms,
        data_dir: cli.data_dir.clone(),
        state_path: cli.state_path(),
        summaries_dir: cli.summaries_dir.clone(),
    }
}

fn list_records(
    out: &mut impl Write,
    data_dir: &Path,
    period: Option<ReportingPeriod>,
) -> Result<()> {
    let store = RecordStore::new(data_dir);
    let period = match period {
        Some(period) => period,
        None => match store.list_periods()?.last().copied() {
            Some(period) => period,
            None => {
                writeln!(out, "no records")?;
                return Ok(());
            }
        },
    };
    let listing = store
        .list_period(period)
        .with_context(|| format!("failed to list records for {period}"))?;
    writeln!(out, "period {period}: {} record(s)", listing.records.len())?;
    for record in &listing.records {
        writeln!(
            out,
            "#{}\t{} -> {}\t{}",
            record.issue_number, record.previous_status, record.current_status, record.title
        )?;
    }
    for failure in &listing.failures {
        tracing::warn!(period = %period, error = %failure, "unreadable record");
    }
    Ok(())
}

fn print_status(out: &mut impl Write, cli: &Cli) -> Result<()> {
    let state_store = CursorStateStore::new(cli.state_path());
    match state_store.load_state()? {
        Some(cursor) => writeln!(
            out,
            "cursor: last_comment_id={} last_processed_at={}",
            cursor.last_comment_id,
            cursor.last_processed_at.to_rfc3339()
        )?,
        None => writeln!(out, "cursor: none (next sync starts fresh)")?,
    }
    let periods = RecordStore::new(&cli.data_dir).list_periods()?;
    writeln!(out, "periods: {}", join_periods(&periods))?;
    Ok(())
}

fn join_periods(periods: &[ReportingPeriod]) -> String {
    if periods.is_empty() {
        return "-".to_string();
    }
    periods
        .iter()
        .map(ReportingPeriod::label)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn unit_cli_defaults_match_the_go_minutes_issue() {
        let cli = Cli::try_parse_from(["propwatch", "--data-dir", "/tmp/propwatch", "sync"])
            .expect("parse");
        let config = sync_config(&cli);
        assert_eq!(config.repo_slug, "golang/go");
        assert_eq!(config.fetcher.minutes_issue, 33502);
        assert_eq!(config.fetcher.per_page, 100);
        assert_eq!(config.state_path, Path::new("/tmp/propwatch/state.json"));
    }

    #[test]
    fn regression_cli_rejects_out_of_range_per_page_and_bad_period() {
        assert!(Cli::try_parse_from(["propwatch", "--per-page", "0", "sync"]).is_err());
        assert!(Cli::try_parse_from(["propwatch", "--per-page", "101", "sync"]).is_err());
        assert!(Cli::try_parse_from(["propwatch", "list", "--period", "2026-13"]).is_err());
    }

    #[test]
    fn functional_list_records_reports_empty_store() {
        let temp = tempdir().expect("tempdir");
        let mut out = Vec::new();
        list_records(&mut out, temp.path(), None).expect("list");
        assert_eq!(String::from_utf8(out).expect("utf8"), "no records\n");
    }

    #[test]
    fn unit_join_periods_formats_labels() {
        let periods = ["2026-W04", "2026-W05"]
            .into_iter()
            .map(|raw| raw.parse::<ReportingPeriod>().expect("period"))
            .collect::<Vec<_>>();
        assert_eq!(join_periods(&periods), "2026-W04,2026-W05");
        assert_eq!(join_periods(&[]), "-");
    }
}
