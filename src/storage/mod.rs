// storage/mod.rs
// Submission persistence

pub mod migrations;
pub mod models;
pub mod pool;
pub mod store;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use models::{
    InsertOutcome, NewSubmission, SubmissionFilter, SubmissionRecord, SubmissionState,
};
pub use pool::{init_db_pool_with_path, DbPool};
pub use store::{SqliteSubmissionStore, SubmissionStore};
