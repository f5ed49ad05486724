//! Configuration constants.
//!
//! This module defines the constants used throughout the application, including
//! remote API limits, pipeline delays, store limits and event channel sizes.
//! Most of them are only defaults; `PipelineSettings` and `PollerSettings`
//! carry the values actually used at runtime.

/// Default base URL of the Netcraft reporting API (v3).
pub const DEFAULT_API_BASE_URL: &str = "https://report.netcraft.com/api/v3";

/// Default SQLite database path.
pub const DB_PATH: &str = "./netcraft_submissions.db";

/// User-Agent sent with every API request.
pub const USER_AGENT: &str = concat!("netcraft_reporter/", env!("CARGO_PKG_VERSION"));

// Remote API limits
/// Maximum number of URLs the reporting endpoint accepts in one call.
pub const MAX_REMOTE_BATCH_SIZE: usize = 1000;
/// Per-request timeout for remote API calls, in seconds.
///
/// The API itself documents no latency bound; 30s keeps a stalled call from
/// holding a job forever while leaving room for large batch submissions.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// Submission pipeline
/// Delay between two batch submissions of the same job, in milliseconds.
pub const INTER_BATCH_DELAY_MS: u64 = 1000;
/// Time given to the remote service to process a batch before asking for
/// per-URL identifiers, in milliseconds.
pub const IDENTIFIER_FETCH_WAIT_MS: u64 = 10_000;
/// Number of retries (after the first attempt) for the identifier lookup.
pub const IDENTIFIER_FETCH_RETRIES: usize = 3;
/// Fixed delay between identifier lookup attempts, in milliseconds.
pub const IDENTIFIER_FETCH_RETRY_DELAY_MS: u64 = 5000;
/// Maximum number of input URLs processed by a single job.
/// Inputs beyond this count must be submitted as a separate job.
pub const MAX_URLS_PER_JOB: usize = 10_000;
/// Number of URLs per store lookup when checking for prior submissions.
/// Keeps the `IN (...)` list well below SQLite's bound-parameter limit.
pub const DEDUP_LOOKUP_CHUNK: usize = 200;
/// Number of rejected inputs echoed back in the `invalid-urls` event.
pub const INVALID_URL_EXAMPLES: usize = 10;

// Status poller
/// Page size used when scanning stored records that still need polling.
pub const POLL_PAGE_SIZE: usize = 1000;
/// Delay between two identifier groups during a sweep, in milliseconds.
pub const POLL_GROUP_DELAY_MS: u64 = 500;
/// Maximum number of concurrent store updates issued for one group.
pub const POLL_UPDATE_CONCURRENCY: usize = 10;

// Export
/// Rows fetched per store page while exporting.
pub const EXPORT_PAGE_SIZE: usize = 1000;

// Storage
/// Maximum time to wait for a pooled database connection, in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
/// Maximum number of pooled SQLite connections.
pub const DB_MAX_CONNECTIONS: u32 = 5;

// Validation and error messages
/// Maximum URL length (2048 characters), matching common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;
/// Maximum stored error message length in characters.
/// Longer messages (e.g. HTML error pages) are truncated before persisting.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;
/// Error text stored for inputs that failed validation.
pub const INVALID_URL_REASON: &str = "Invalid URL format";
/// Error text stored for URLs not submitted because the API rate limit was hit.
pub const RATE_LIMIT_REASON: &str = "Rate limit reached";

// Job events
/// Capacity of each job's event broadcast channel.
pub const JOB_EVENT_CHANNEL_CAPACITY: usize = 1024;
/// Emit a validation progress event every N inputs.
pub const VALIDATION_PROGRESS_INTERVAL: usize = 500;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
