use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// ISO-8601 week bucket used to partition persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportingPeriod {
    pub year: i32,
    pub week: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid reporting period '{0}', expected YYYY-Www")]
pub struct InvalidPeriodError(pub String);

impl ReportingPeriod {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|_| Self { year, week })
    }

    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let iso = timestamp.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Directory and file label, e.g. `2026-W05`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for ReportingPeriod {
    type Err = InvalidPeriodError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPeriodError(raw.to_string());
        let (year, week) = raw.trim().split_once("-W").ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, week).ok_or_else(invalid)
    }
}

impl Serialize for ReportingPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportingPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
