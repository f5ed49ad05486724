//! Command-line options.
//!
//! The CLI is a thin layer over `Config`: global options map onto the library
//! configuration, subcommands select which operation to run.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{DB_PATH, DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::config::types::{Config, LogFormat, LogLevel};
use crate::export::ExportFormat;
use crate::storage::SubmissionState;

/// Command-line interface.
///
/// # Examples
///
/// ```bash
/// # Report every URL listed in urls.txt
/// netcraft_reporter --email me@example.com report urls.txt
///
/// # Poll the API for classification results of pending submissions
/// netcraft_reporter check
///
/// # Export credited URLs
/// netcraft_reporter export --tag credited --output credited-urls.txt
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "netcraft_reporter",
    about = "Reports URLs to Netcraft and tracks their classification."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Reporter email address sent with each submission
    #[arg(long, global = true, env = "NETCRAFT_EMAIL", default_value = "")]
    pub email: String,

    /// Netcraft API key (optional)
    #[arg(long, global = true, env = "NETCRAFT_API_KEY")]
    pub api_key: Option<String>,

    /// Reporting API base URL
    #[arg(long, global = true, env = "NETCRAFT_API_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_url: String,

    /// Database path (SQLite file)
    #[arg(long, global = true, env = "NETCRAFT_DB_PATH", default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Per-request timeout for API calls in seconds
    #[arg(long, global = true, default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Builds the library configuration from the global options.
    pub fn to_config(&self) -> Config {
        Config {
            email: self.email.clone(),
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            api_base_url: self.api_url.clone(),
            db_path: self.db_path.clone(),
            request_timeout_secs: self.timeout_seconds,
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            ..Default::default()
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report URLs from a text file (one per line, `-` for stdin)
    Report(ReportArgs),
    /// Poll the API and update the state of unresolved submissions
    Check,
    /// Export stored URLs to a text or CSV file
    Export(ExportArgs),
    /// Delete stored submissions by state or by URL list
    Purge(PurgeArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// File to read URLs from (`-` for stdin)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// URLs per batch submission (max 1000)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum number of URLs processed in this run
    #[arg(long)]
    pub max_urls: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Only export URLs carrying this tag
    #[arg(long, default_value = "credited")]
    pub tag: String,

    /// Export regardless of tags
    #[arg(long)]
    pub any_tag: bool,

    /// Only export URLs in this state (e.g. "malicious", "no threats")
    #[arg(long, value_parser = parse_state)]
    pub state: Option<SubmissionState>,

    /// Output format
    #[arg(long, value_enum, default_value_t = CliExportFormat::Text)]
    pub format: CliExportFormat,

    /// Output file (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Delete every submission in these states (repeatable)
    #[arg(long = "state", value_parser = parse_state)]
    pub states: Vec<SubmissionState>,

    /// Delete the URLs listed in this file
    #[arg(long)]
    pub urls: Option<PathBuf>,
}

/// Export format as accepted on the command line.
#[derive(Clone, Debug, ValueEnum)]
pub enum CliExportFormat {
    /// One URL per line
    Text,
    /// Full records as CSV
    Csv,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(f: CliExportFormat) -> Self {
        match f {
            CliExportFormat::Text => ExportFormat::Text,
            CliExportFormat::Csv => ExportFormat::Csv,
        }
    }
}

fn parse_state(s: &str) -> Result<SubmissionState, String> {
    s.parse::<SubmissionState>()
        .map_err(|_| format!("unknown submission state: {s}"))
}
