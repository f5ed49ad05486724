//! Status reconciliation sweep.
//!
//! Independent of submission jobs: every stored record that has an
//! identifier and a non-terminal state is grouped by identifier, each group
//! is queried remotely and the classification results are written back.

mod sweep;

pub use sweep::{match_results, StatusPoller, SweepReport};
