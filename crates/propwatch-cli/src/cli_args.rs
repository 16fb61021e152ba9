use std::path::PathBuf;

use clap::{Parser, Subcommand};
use propwatch_core::ReportingPeriod;
use propwatch_github_runtime::{DEFAULT_MAX_PAGES, DEFAULT_MINUTES_ISSUE, DEFAULT_PER_PAGE};

#[derive(Debug, Parser)]
#[command(
    name = "propwatch",
    about = "Tracks proposal status changes published in weekly review minutes",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "github-repo",
        env = "PROPWATCH_GITHUB_REPO",
        default_value = "golang/go",
        help = "Repository hosting the minutes issue, in owner/repo form"
    )]
    pub(crate) github_repo: String,

    #[arg(
        long = "minutes-issue",
        env = "PROPWATCH_MINUTES_ISSUE",
        default_value_t = DEFAULT_MINUTES_ISSUE,
        help = "Issue number whose comments carry the review minutes"
    )]
    pub(crate) minutes_issue: u64,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token; requests are unauthenticated when unset"
    )]
    pub(crate) github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "PROPWATCH_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub REST API base URL"
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long = "data-dir",
        env = "PROPWATCH_DATA_DIR",
        default_value = ".propwatch",
        help = "Directory holding records, change logs, and the default state file"
    )]
    pub(crate) data_dir: PathBuf,

    #[arg(
        long = "state-file",
        env = "PROPWATCH_STATE_FILE",
        help = "Cursor state file (defaults to <data-dir>/state.json)"
    )]
    pub(crate) state_file: Option<PathBuf>,

    #[arg(
        long = "summaries-dir",
        env = "PROPWATCH_SUMMARIES_DIR",
        help = "Directory of externally written <issue>.md summaries"
    )]
    pub(crate) summaries_dir: Option<PathBuf>,

    #[arg(
        long = "per-page",
        env = "PROPWATCH_PER_PAGE",
        default_value_t = DEFAULT_PER_PAGE,
        value_parser = clap::value_parser!(u32).range(1..=100),
        help = "Comments requested per page"
    )]
    pub(crate) per_page: u32,

    #[arg(
        long = "max-pages",
        env = "PROPWATCH_MAX_PAGES",
        default_value_t = DEFAULT_MAX_PAGES,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Upper bound on pages fetched in one run"
    )]
    pub(crate) max_pages: u32,

    #[arg(
        long = "request-timeout-ms",
        env = "PROPWATCH_REQUEST_TIMEOUT_MS",
        help = "Per-request HTTP timeout in milliseconds"
    )]
    pub(crate) request_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Fetch new minutes comments and update records.
    Sync,
    /// Fold externally written summaries into stored records.
    IntegrateSummaries {
        #[arg(long, help = "Reporting period as YYYY-Www (defaults to the latest)")]
        period: Option<ReportingPeriod>,
    },
    /// Print the records of one reporting period.
    List {
        #[arg(long, help = "Reporting period as YYYY-Www (defaults to the latest)")]
        period: Option<ReportingPeriod>,
    },
    /// Print the cursor and the recorded periods.
    Status,
}

impl Cli {
    pub(crate) fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("state.json"))
    }
}
