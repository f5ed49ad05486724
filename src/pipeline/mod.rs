//! Submission pipeline stages.
//!
//! A job runs the stages in order, each as a plain async function:
//! 1. `validate`: normalize raw inputs, split off rejects
//! 2. `dedup`: collapse duplicates within the job and against the store
//! 3. `submit`: report chunks sequentially and persist the outcome
//! 4. `reconcile`: resolve per-URL identifiers after each accepted chunk
//!
//! Stages share a `StageContext` and stop early with `Halt` when the job is
//! cancelled or hits an unrecoverable error.

mod dedup;
mod normalize;
mod reconcile;
mod submit;
#[cfg(test)]
pub(crate) mod test_support;
mod validate;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::ReportingApi;
use crate::config::PipelineSettings;
use crate::error_handling::{DatabaseError, ProcessingStats};
use crate::storage::SubmissionStore;

pub use dedup::{collapse_duplicates, deduplicate, DedupOutcome};
pub use normalize::{normalize_url, urls_match, RejectReason};
pub use reconcile::{resolve_identifiers, ReconcileReport};
pub use submit::{submit_all, SubmissionTally};
pub use validate::{persist_invalid, validate_inputs, ValidatedInput};

/// Collaborators and settings shared by all stages of one job.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub store: &'a dyn SubmissionStore,
    pub api: &'a dyn ReportingApi,
    pub settings: &'a PipelineSettings,
    pub cancel: &'a CancellationToken,
    pub stats: &'a ProcessingStats,
}

/// Why a stage stopped before finishing.
#[derive(Debug)]
pub enum Halt {
    /// The job's cancellation token fired.
    Cancelled,
    /// An error the job cannot continue after.
    Fatal(anyhow::Error),
}

impl From<DatabaseError> for Halt {
    fn from(e: DatabaseError) -> Self {
        Halt::Fatal(anyhow::Error::new(e).context("Submission store failure"))
    }
}

pub type StageResult<T> = Result<T, Halt>;

impl StageContext<'_> {
    /// Fails with `Halt::Cancelled` once cancellation was requested.
    pub fn check_cancelled(&self) -> StageResult<()> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` unless the job is cancelled first.
    pub async fn pause(&self, duration: Duration) -> StageResult<()> {
        if duration.is_zero() {
            return self.check_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
