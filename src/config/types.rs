//! Configuration types.
//!
//! This module defines the enums and structs used to configure the library,
//! independent of the CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Tuning values for submission jobs.
///
/// These are operational values, not invariants: changing them never changes
/// the ordering guarantees (one outstanding batch submission per job).
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// URLs per remote batch submission (clamped to `MAX_REMOTE_BATCH_SIZE`)
    pub batch_size: usize,
    /// Delay between consecutive batch submissions
    pub inter_batch_delay: Duration,
    /// Wait before asking for per-URL identifiers of a fresh batch
    pub identifier_fetch_wait: Duration,
    /// Retries (after the first attempt) for the identifier lookup
    pub identifier_fetch_retries: usize,
    /// Fixed delay between identifier lookup attempts
    pub identifier_fetch_retry_delay: Duration,
    /// Maximum number of inputs processed by one job
    pub max_urls_per_job: usize,
    /// URLs per store lookup during deduplication
    pub dedup_lookup_chunk: usize,
}

impl PipelineSettings {
    /// Batch size actually used, never above what the remote API accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_REMOTE_BATCH_SIZE)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: MAX_REMOTE_BATCH_SIZE,
            inter_batch_delay: Duration::from_millis(INTER_BATCH_DELAY_MS),
            identifier_fetch_wait: Duration::from_millis(IDENTIFIER_FETCH_WAIT_MS),
            identifier_fetch_retries: IDENTIFIER_FETCH_RETRIES,
            identifier_fetch_retry_delay: Duration::from_millis(IDENTIFIER_FETCH_RETRY_DELAY_MS),
            max_urls_per_job: MAX_URLS_PER_JOB,
            dedup_lookup_chunk: DEDUP_LOOKUP_CHUNK,
        }
    }
}

/// Tuning values for the status reconciliation sweep.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Rows fetched per store page
    pub page_size: usize,
    /// Delay between identifier groups
    pub group_delay: Duration,
    /// Maximum concurrent store updates per group
    pub update_concurrency: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            page_size: POLL_PAGE_SIZE,
            group_delay: Duration::from_millis(POLL_GROUP_DELAY_MS),
            update_concurrency: POLL_UPDATE_CONCURRENCY,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use netcraft_reporter::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     email: "reporter@example.com".to_string(),
///     db_path: PathBuf::from("./submissions.db"),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Reporter email sent with every batch submission
    pub email: String,

    /// Optional API key, sent as a bearer token
    pub api_key: Option<String>,

    /// Base URL of the reporting API
    pub api_base_url: String,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Per-request timeout for remote API calls in seconds
    pub request_timeout_secs: u64,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Submission job tuning
    pub pipeline: PipelineSettings,

    /// Reconciliation sweep tuning
    pub poller: PollerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: String::new(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            db_path: PathBuf::from(DB_PATH),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            pipeline: PipelineSettings::default(),
            poller: PollerSettings::default(),
        }
    }
}
