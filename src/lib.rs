//! netcraft_reporter library: bulk URL reporting and classification tracking
//!
//! This library submits lists of URLs to the Netcraft reporting API in
//! chunked batches, records every submission in a SQLite database, resolves
//! per-URL identifiers for each accepted batch, and reconciles stored records
//! with the classification results the API publishes later.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use netcraft_reporter::{
//!     Config, JobController, JobEvent, JobRegistry, NetcraftClient, ProcessingStats,
//!     SqliteSubmissionStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     email: "reporter@example.com".to_string(),
//!     ..Default::default()
//! };
//! let store = Arc::new(SqliteSubmissionStore::open(&config.db_path).await?);
//! let api = Arc::new(NetcraftClient::from_config(&config)?);
//! let controller = JobController::new(
//!     store,
//!     api,
//!     Arc::new(JobRegistry::new()),
//!     config.pipeline.clone(),
//!     Arc::new(ProcessingStats::new()),
//! );
//!
//! let mut job = controller.submit(vec!["phishing.example.com".to_string()]);
//! while let Ok(event) = job.events.recv().await {
//!     if let JobEvent::Complete { totals, .. } = &event {
//!         println!("Reported {} of {} URLs", totals.reported, totals.total);
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod api;
pub mod app;
pub mod config;
mod error_handling;
pub mod export;
pub mod initialization;
mod job;
mod pipeline;
mod poller;
mod storage;

// Re-export public API
pub use api::{
    tag_labels, NetcraftClient, ReportingApi, SubmissionStatus, SubmissionUrl, Tag, UrlData,
    UrlIdentifier,
};
pub use config::{Config, LogFormat, LogLevel, PipelineSettings, PollerSettings};
pub use error_handling::{
    ApiError, DatabaseError, ErrorType, InfoType, InitializationError, ProcessingStats,
};
pub use job::{
    JobController, JobEvent, JobHandle, JobRegistry, JobState, JobStatus, JobTotals, Stage,
};
pub use pipeline::{normalize_url, urls_match, RejectReason};
pub use poller::{StatusPoller, SweepReport};
pub use storage::{
    run_migrations, InsertOutcome, NewSubmission, SqliteSubmissionStore, SubmissionFilter,
    SubmissionRecord, SubmissionState, SubmissionStore,
};
