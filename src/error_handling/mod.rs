//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions for initialization, storage and the remote API
//! - Processing statistics tracking (errors and info metrics)
//! - Retry strategy configuration
//! - Error categorization
//!
//! Counted categories are:
//! - **Errors**: Failures of remote calls or store writes
//! - **Info**: Notable events (identifier resolution, concurrent inserts, etc.)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_api_error, categorize_reqwest_error, get_retry_strategy, update_error_stats,
};
pub use stats::ProcessingStats;
pub use types::{ApiError, DatabaseError, ErrorType, InfoType, InitializationError};
