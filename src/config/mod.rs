//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (delays, limits, timeouts)
//! - Library configuration types (`Config`, `PipelineSettings`, `PollerSettings`)
//! - CLI option types and parsing

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::{Cli, CliExportFormat, Command, ExportArgs, GlobalArgs, PurgeArgs, ReportArgs};
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, PipelineSettings, PollerSettings};
