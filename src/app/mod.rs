//! Command-line application helpers.
//!
//! This module provides input reading, job event handling, Ctrl-C handling
//! and statistics printing used by the binary.

pub mod events;
pub mod input;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use events::wait_for_terminal_event;
pub use input::{parse_url_lines, read_url_list};
pub use shutdown::cancel_on_interrupt;
pub use statistics::{print_error_statistics, print_job_summary};
