//! Directory layout for persisted records:
//!
//! ```text
//! <data_dir>/records/<YYYY-Www>/<issue_number>.md
//! ```

use std::io;
use std::path::PathBuf;

use propwatch_core::{is_valid_issue_number, ReportingPeriod};

use crate::error::{RecordError, RecordResult, ValidationError};
use crate::record::PersistedProposalRecord;
use crate::record_file::{parse_record_file, render_record_file};
use crate::staged_write::StagedWrite;

const RECORD_EXTENSION: &str = "md";
const QUARANTINE_SUFFIX: &str = "corrupt";

/// Records of one period, plus the files that failed validation.
#[derive(Debug)]
pub struct PeriodListing {
    pub period: ReportingPeriod,
    pub records: Vec<PersistedProposalRecord>,
    pub failures: Vec<RecordError>,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into().join("records"),
        }
    }

    pub fn period_dir(&self, period: ReportingPeriod) -> PathBuf {
        self.root.join(period.label())
    }

    pub fn record_path(&self, period: ReportingPeriod, issue_number: u64) -> PathBuf {
        self.period_dir(period)
            .join(format!("{issue_number}.{RECORD_EXTENSION}"))
    }

    /// Loads one record; `Ok(None)` when no file exists for the key.
    pub fn load_record(
        &self,
        period: ReportingPeriod,
        issue_number: u64,
    ) -> RecordResult<Option<PersistedProposalRecord>> {
        let path = self.record_path(period, issue_number);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RecordError::Read { path, source }),
        };
        let record = parse_record_file(&path, &content)?;
        if record.issue_number != issue_number {
            return Err(ValidationError::new(
                &path,
                format!(
                    "issue_number {} does not match file name",
                    record.issue_number
                ),
            )
            .into());
        }
        if record.period() != period {
            return Err(ValidationError::new(
                &path,
                format!(
                    "changed_at falls in {} but the file is filed under {period}",
                    record.period()
                ),
            )
            .into());
        }
        Ok(Some(record))
    }

    /// Renders a record without touching disk.
    pub fn stage_record(&self, record: &PersistedProposalRecord) -> RecordResult<StagedWrite> {
        Ok(StagedWrite {
            path: self.record_path(record.period(), record.issue_number),
            contents: render_record_file(record)?,
        })
    }

    pub fn save_record(&self, record: &PersistedProposalRecord) -> RecordResult<PathBuf> {
        let staged = self.stage_record(record)?;
        staged.commit()?;
        Ok(staged.path)
    }

    /// Moves a record file aside as `<n>.md.corrupt` (or `<n>.md.corrupt.<k>`
    /// when that name is taken) and returns the new path.
    pub fn quarantine_record(
        &self,
        period: ReportingPeriod,
        issue_number: u64,
    ) -> RecordResult<PathBuf> {
        let path = self.record_path(period, issue_number);
        let mut target = path.with_extension(format!("{RECORD_EXTENSION}.{QUARANTINE_SUFFIX}"));
        let mut attempt = 1u32;
        while target.exists() {
            target = path.with_extension(format!(
                "{RECORD_EXTENSION}.{QUARANTINE_SUFFIX}.{attempt}"
            ));
            attempt += 1;
        }
        std::fs::rename(&path, &target).map_err(|source| RecordError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    /// Lists every record of `period`, collecting per-file failures instead of
    /// aborting on the first corrupt file.
    pub fn list_period(&self, period: ReportingPeriod) -> RecordResult<PeriodListing> {
        let mut listing = PeriodListing {
            period,
            records: Vec::new(),
            failures: Vec::new(),
        };
        let dir = self.period_dir(period);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(listing),
            Err(source) => return Err(RecordError::Read { path: dir, source }),
        };
        let mut issue_numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RecordError::Read {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem.is_empty() || !stem.bytes().all(|byte| byte.is_ascii_digit()) {
                continue;
            }
            match stem.parse::<u64>().ok().filter(|n| is_valid_issue_number(*n)) {
                Some(number) => issue_numbers.push(number),
                None => listing.failures.push(
                    ValidationError::new(&path, "issue number in file name is out of range")
                        .into(),
                ),
            }
        }
        issue_numbers.sort_unstable();
        for issue_number in issue_numbers {
            match self.load_record(period, issue_number) {
                Ok(Some(record)) => listing.records.push(record),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%period, issue_number, error = %error, "skipping unreadable record");
                    listing.failures.push(error);
                }
            }
        }
        Ok(listing)
    }

    /// Periods that have a record directory, oldest first.
    pub fn list_periods(&self) -> RecordResult<Vec<ReportingPeriod>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RecordError::Read {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        let mut periods = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<ReportingPeriod>().ok())
            .collect::<Vec<_>>();
        periods.sort_unstable();
        Ok(periods)
    }

    /// Most recent valid record for `issue_number` filed strictly before `period`.
    pub fn latest_record_before(
        &self,
        period: ReportingPeriod,
        issue_number: u64,
    ) -> RecordResult<Option<PersistedProposalRecord>> {
        for earlier in self
            .list_periods()?
            .into_iter()
            .rev()
            .filter(|candidate| *candidate < period)
        {
            match self.load_record(earlier, issue_number) {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => {}
                Err(RecordError::Validation(error)) => {
                    tracing::warn!(error = %error, "ignoring corrupt record while looking up history");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(None)
    }
}
