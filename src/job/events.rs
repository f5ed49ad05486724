//! Job event types.
//!
//! Every job publishes a stream of `JobEvent`s on its own broadcast channel.
//! Events serialize as internally tagged JSON (`"type": "rate-limit"`, ...)
//! with camelCase fields so they can be forwarded to any transport as-is.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::job::registry::{JobRegistry, JobState};

/// Pipeline stage named in `progress` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Validating,
    Filtering,
    Submitting,
    Storing,
    Resolving,
}

/// Totals reported by the final `complete` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTotals {
    pub total: usize,
    pub reported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub invalid: usize,
}

impl JobTotals {
    /// Whether every input is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.total == self.reported + self.skipped + self.failed + self.invalid
    }
}

/// Events published while a job runs.
///
/// Exactly one of `Complete`, `Stopped` or `Error` ends every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum JobEvent {
    Progress {
        stage: Stage,
        message: String,
        progress: f64,
    },
    InvalidUrls {
        count: usize,
        urls: Vec<String>,
        message: String,
    },
    RateLimit {
        message: String,
        processed: usize,
        total: usize,
        remaining: usize,
    },
    BatchError {
        batch_num: usize,
        total_batches: usize,
        error: String,
        message: String,
    },
    UrlLimitWarning {
        total: usize,
        processing: usize,
        remaining: usize,
        message: String,
    },
    Complete {
        success: bool,
        #[serde(flatten)]
        totals: JobTotals,
        #[serde(default)]
        rate_limit_reached: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Stopped,
    Error {
        message: String,
    },
}

impl JobEvent {
    /// Whether this event ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Complete { .. } | JobEvent::Stopped | JobEvent::Error { .. }
        )
    }
}

/// Publishes the events of one job and mirrors its lifecycle state into the
/// registry.
///
/// Progress published through the emitter never decreases and never exceeds
/// 100. Every event is logged as well, so runs without a subscriber still
/// leave a trace.
pub struct JobEmitter {
    job_id: Uuid,
    tx: broadcast::Sender<JobEvent>,
    registry: Option<Arc<JobRegistry>>,
    last_progress: f64,
}

impl JobEmitter {
    pub fn new(job_id: Uuid, tx: broadcast::Sender<JobEvent>) -> Self {
        Self {
            job_id,
            tx,
            registry: None,
            last_progress: 0.0,
        }
    }

    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn set_state(&self, state: JobState) {
        debug!("[job {}] state -> {state}", self.job_id);
        if let Some(registry) = &self.registry {
            registry.set_state(self.job_id, state);
        }
    }

    pub fn progress(&mut self, stage: Stage, message: impl Into<String>, progress: f64) {
        let progress = if progress.is_finite() {
            progress.clamp(self.last_progress, 100.0)
        } else {
            self.last_progress
        };
        self.last_progress = progress;
        self.emit(JobEvent::Progress {
            stage,
            message: message.into(),
            progress,
        });
    }

    pub fn emit(&self, event: JobEvent) {
        log_event(self.job_id, &event);
        // No subscriber is not an error: the job keeps running headless
        let _ = self.tx.send(event);
    }
}

fn log_event(job_id: Uuid, event: &JobEvent) {
    match event {
        JobEvent::Progress {
            stage,
            message,
            progress,
        } => debug!("[job {job_id}] [{stage}] {message} ({progress:.0}%)"),
        JobEvent::InvalidUrls { count, message, .. } => {
            warn!("[job {job_id}] {count} invalid URL(s): {message}")
        }
        JobEvent::RateLimit {
            message, remaining, ..
        } => warn!("[job {job_id}] {message} ({remaining} URL(s) not submitted)"),
        JobEvent::BatchError {
            batch_num,
            total_batches,
            error,
            ..
        } => warn!("[job {job_id}] Batch {batch_num}/{total_batches} failed: {error}"),
        JobEvent::UrlLimitWarning { message, .. } => warn!("[job {job_id}] {message}"),
        JobEvent::Complete {
            success, totals, ..
        } => info!(
            "[job {job_id}] Complete (success={success}): total={} reported={} skipped={} failed={} invalid={}",
            totals.total, totals.reported, totals.skipped, totals.failed, totals.invalid
        ),
        JobEvent::Stopped => info!("[job {job_id}] Stopped"),
        JobEvent::Error { message } => log::error!("[job {job_id}] Error: {message}"),
    }
}
