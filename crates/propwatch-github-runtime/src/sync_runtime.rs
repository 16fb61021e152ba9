//! One tracker run: fetch → extract → reconcile → persist → advance cursor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use propwatch_core::{ProposalChange, ReportingPeriod};
use propwatch_records::{
    apply_fallback, integrate_summaries, load_summary_inputs, merge, stage_period_changes,
    PersistedProposalRecord, RecordError, RecordResult, RecordStore,
};
use thiserror::Error;
use tokio::sync::watch;

use crate::comment_fetcher::{CommentFetcher, CommentFetcherConfig};
use crate::fetch_error::FetchError;
use crate::github_api_client::{GithubApiClient, RepoRef};
use crate::state_store::{CursorStateStore, StorageError};

pub const EXIT_CODE_FAILURE: i32 = 1;
pub const EXIT_CODE_RATE_LIMITED: i32 = 2;
pub const EXIT_CODE_FORBIDDEN: i32 = 3;
pub const EXIT_CODE_SERVER_ERROR: i32 = 4;
pub const EXIT_CODE_CANCELLED: i32 = 130;

#[derive(Debug, Clone)]
pub struct SyncRuntimeConfig {
    pub github_api_base: String,
    pub github_token: String,
    pub repo_slug: String,
    pub fetcher: CommentFetcherConfig,
    pub request_timeout_ms: Option<u64>,
    pub data_dir: PathBuf,
    pub state_path: PathBuf,
    pub summaries_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub changes: usize,
    pub comments_processed: usize,
    pub periods: Vec<ReportingPeriod>,
    pub records_written: usize,
    pub summaries_integrated: usize,
    pub fallback_applied: usize,
    pub cursor_advanced: bool,
    pub requests_made: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrateReport {
    pub period: Option<ReportingPeriod>,
    pub records: usize,
    pub summaries_integrated: usize,
    pub fallback_applied: usize,
    pub failures: usize,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("sync cancelled before any state was written")]
    Cancelled,
}

impl SyncError {
    /// Process exit code the scheduler uses to triage the failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fetch(FetchError::RateLimited { .. }) => EXIT_CODE_RATE_LIMITED,
            Self::Fetch(FetchError::Forbidden { .. }) => EXIT_CODE_FORBIDDEN,
            Self::Fetch(FetchError::ServerError { .. }) => EXIT_CODE_SERVER_ERROR,
            Self::Fetch(FetchError::Cancelled) | Self::Cancelled => EXIT_CODE_CANCELLED,
            _ => EXIT_CODE_FAILURE,
        }
    }
}

/// Records and change-log entries computed for one run, not yet written.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub records: BTreeMap<ReportingPeriod, BTreeMap<u64, PersistedProposalRecord>>,
    pub changes: BTreeMap<ReportingPeriod, Vec<ProposalChange>>,
    /// Record files that failed validation; moved aside before rebuilt
    /// records replace them.
    pub quarantine: Vec<(ReportingPeriod, u64)>,
}

impl ReconcilePlan {
    pub fn periods(&self) -> Vec<ReportingPeriod> {
        self.records.keys().copied().collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    fn records_mut(&mut self) -> impl Iterator<Item = &mut PersistedProposalRecord> {
        self.records.values_mut().flat_map(BTreeMap::values_mut)
    }
}

/// Merges `changes` (ascending by `changed_at`) into the records already on
/// disk, filling an unknown previous status from the issue's latest record in
/// an earlier period.
pub fn reconcile_changes(
    store: &RecordStore,
    changes: &[ProposalChange],
) -> RecordResult<ReconcilePlan> {
    let mut plan = ReconcilePlan::default();
    for change in changes {
        let period = change.period();
        let issue_number = change.issue_number;
        let existing = match plan
            .records
            .get(&period)
            .and_then(|records| records.get(&issue_number))
        {
            Some(record) => Some(record.clone()),
            None => load_existing(store, period, issue_number, &mut plan.quarantine)?,
        };

        let needs_history = existing
            .as_ref()
            .map_or(true, |record| record.previous_status_inferred);
        let incoming = match change.previous_status {
            None if needs_history => match store.latest_record_before(period, issue_number)? {
                Some(prior) => change.with_previous_status(prior.current_status),
                None => change.clone(),
            },
            _ => change.clone(),
        };

        let merged = merge(existing.as_ref(), &incoming);
        plan.records
            .entry(period)
            .or_default()
            .insert(issue_number, merged);
        plan.changes.entry(period).or_default().push(incoming);
    }
    Ok(plan)
}

fn load_existing(
    store: &RecordStore,
    period: ReportingPeriod,
    issue_number: u64,
    quarantine: &mut Vec<(ReportingPeriod, u64)>,
) -> RecordResult<Option<PersistedProposalRecord>> {
    match store.load_record(period, issue_number) {
        Ok(record) => Ok(record),
        Err(RecordError::Validation(error)) => {
            tracing::warn!(
                issue_number,
                period = %period,
                error = %error,
                "rebuilding corrupt record; the original will be kept aside"
            );
            quarantine.push((period, issue_number));
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Runs one sync pass. On any error the cursor file is left untouched.
pub async fn run_sync(
    config: &SyncRuntimeConfig,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<SyncReport, SyncError> {
    let state_store = CursorStateStore::new(&config.state_path);
    let cursor = state_store.load_state()?;
    let repo = RepoRef::parse(&config.repo_slug)?;
    let client = GithubApiClient::new(
        config.github_api_base.clone(),
        config.github_token.clone(),
        repo,
        config.request_timeout_ms,
    )?;
    let fetcher = CommentFetcher::new(client, config.fetcher);
    let outcome = match fetcher.fetch_changes(cursor.as_ref(), &mut cancel_rx).await {
        Ok(outcome) => outcome,
        Err(FetchError::Cancelled) => return Err(SyncError::Cancelled),
        Err(error) => return Err(error.into()),
    };

    let mut report = SyncReport {
        changes: outcome.changes.len(),
        comments_processed: outcome.processed_comment_ids.len(),
        requests_made: outcome.requests_made,
        ..SyncReport::default()
    };
    let Some(next_cursor) = outcome.next_cursor else {
        tracing::info!(requests = report.requests_made, "no new minutes comments");
        return Ok(report);
    };

    let record_store = RecordStore::new(&config.data_dir);
    let mut plan = reconcile_changes(&record_store, &outcome.changes)?;
    if let Some(summaries_dir) = config.summaries_dir.as_deref() {
        let summaries = load_summary_inputs(summaries_dir)?;
        for records in plan.records.values_mut() {
            let mut period_records = records.values().cloned().collect::<Vec<_>>();
            report.summaries_integrated += integrate_summaries(&mut period_records, &summaries);
            for record in period_records {
                records.insert(record.issue_number, record);
            }
        }
    }
    for record in plan.records_mut() {
        report.fallback_applied += apply_fallback(std::slice::from_mut(record));
    }

    if *cancel_rx.borrow() {
        tracing::warn!("sync cancelled before writing records");
        return Err(SyncError::Cancelled);
    }

    let now = Utc::now();
    report.records_written = write_plan(&record_store, &config.data_dir, &plan, now)?;
    report.periods = plan.periods();
    state_store.save_state(&next_cursor)?;
    report.cursor_advanced = true;
    tracing::info!(
        changes = report.changes,
        records = report.records_written,
        periods = report.periods.len(),
        last_comment_id = next_cursor.last_comment_id,
        "sync complete"
    );
    Ok(report)
}

/// Renders every record and change log before the first write, so a plan
/// that cannot be encoded leaves the data directory untouched.
fn write_plan(
    store: &RecordStore,
    data_dir: &Path,
    plan: &ReconcilePlan,
    now: DateTime<Utc>,
) -> RecordResult<usize> {
    let mut staged = Vec::new();
    for record in plan.records.values().flat_map(BTreeMap::values) {
        staged.push(store.stage_record(record)?);
    }
    let records_written = staged.len();
    for (period, changes) in &plan.changes {
        staged.push(stage_period_changes(data_dir, *period, changes, now)?);
    }

    for &(period, issue_number) in &plan.quarantine {
        let kept = store.quarantine_record(period, issue_number)?;
        tracing::warn!(
            issue_number,
            period = %period,
            path = %kept.display(),
            "moved corrupt record aside"
        );
    }
    for write in &staged {
        write.commit()?;
        tracing::debug!(path = %write.path.display(), "wrote sync output");
    }
    Ok(records_written)
}

/// Folds summaries from `summaries_dir` into the stored records of `period`
/// (the latest period on disk when `None`) and regenerates fallback text.
pub fn run_integrate_summaries(
    data_dir: &Path,
    period: Option<ReportingPeriod>,
    summaries_dir: &Path,
) -> Result<IntegrateReport, SyncError> {
    let store = RecordStore::new(data_dir);
    let Some(period) = period.or(store.list_periods()?.last().copied()) else {
        tracing::info!("no reporting periods recorded yet");
        return Ok(IntegrateReport::default());
    };
    let mut listing = store.list_period(period)?;
    for failure in &listing.failures {
        tracing::warn!(period = %period, error = %failure, "skipping unreadable record");
    }
    let summaries = load_summary_inputs(summaries_dir)?;
    let summaries_integrated = integrate_summaries(&mut listing.records, &summaries);
    let fallback_applied = apply_fallback(&mut listing.records);
    for record in &listing.records {
        store.save_record(record)?;
    }
    tracing::info!(
        period = %period,
        records = listing.records.len(),
        summaries = summaries_integrated,
        fallback = fallback_applied,
        "integrated summaries"
    );
    Ok(IntegrateReport {
        period: Some(period),
        records: listing.records.len(),
        summaries_integrated,
        fallback_applied,
        failures: listing.failures.len(),
    })
}
