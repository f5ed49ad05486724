//! Registry of running jobs.
//!
//! The registry is owned by whoever creates the `JobController` and injected
//! into it; there is no process-wide job table. An entry lives from
//! submission until the job's terminal event has been published.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::job::events::JobEvent;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum JobState {
    Created,
    Validating,
    Deduplicating,
    Submitting,
    Reconciling,
    Complete,
    Stopped,
    Errored,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Stopped | JobState::Errored)
    }
}

/// Snapshot of one registered job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: Uuid,
    pub state: JobState,
    pub cancel_requested: bool,
    #[serde(skip)]
    pub started_at: Instant,
}

struct JobEntry {
    state: JobState,
    cancel: CancellationToken,
    events: broadcast::Sender<JobEvent>,
    started_at: Instant,
}

/// Maps job IDs to their cancellation token, state and event channel.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new job and returns its cancellation token.
    pub fn register(&self, id: Uuid, events: broadcast::Sender<JobEvent>) -> CancellationToken {
        let cancel = CancellationToken::new();
        let entry = JobEntry {
            state: JobState::Created,
            cancel: cancel.clone(),
            events,
            started_at: Instant::now(),
        };
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, entry);
        cancel
    }

    /// Requests cancellation. Returns `false` for unknown or finished jobs.
    pub fn cancel(&self, id: Uuid) -> bool {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        match jobs.get(&id) {
            Some(entry) if !entry.state.is_finished() => {
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn set_state(&self, id: Uuid, state: JobState) {
        if let Some(entry) = self
            .jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&id)
        {
            entry.state = state;
        }
    }

    /// Removes a job once its terminal event is out.
    pub fn remove(&self, id: Uuid) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Attaches another observer to a running job.
    pub fn subscribe(&self, id: Uuid) -> Option<broadcast::Receiver<JobEvent>> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(|entry| entry.events.subscribe())
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(|entry| JobStatus {
                id,
                state: entry.state,
                cancel_requested: entry.cancel.is_cancelled(),
                started_at: entry.started_at,
            })
    }

    /// IDs of all registered jobs.
    pub fn active_jobs(&self) -> Vec<Uuid> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }
}
