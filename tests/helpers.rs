// Shared helpers for the integration tests.
//
// Each test file pulls this in with `mod helpers;`, so not every helper is
// used by every file.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use netcraft_reporter::{
    JobController, JobEvent, JobHandle, JobRegistry, JobTotals, NetcraftClient, PipelineSettings,
    ProcessingStats, ReportingApi, SqliteSubmissionStore,
};
use tempfile::TempDir;
use wiremock::MockServer;

/// Opens a fresh on-disk store. Keep the `TempDir` alive for the test's duration.
pub async fn temp_store() -> (TempDir, Arc<SqliteSubmissionStore>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = SqliteSubmissionStore::open(&dir.path().join("submissions.db"))
        .await
        .expect("Failed to open store");
    (dir, Arc::new(store))
}

/// Pipeline settings with the given batch size and no delays or retries.
pub fn fast_settings(batch_size: usize) -> PipelineSettings {
    PipelineSettings {
        batch_size,
        inter_batch_delay: Duration::ZERO,
        identifier_fetch_wait: Duration::ZERO,
        identifier_fetch_retries: 0,
        identifier_fetch_retry_delay: Duration::ZERO,
        ..Default::default()
    }
}

pub fn client_for(server: &MockServer) -> NetcraftClient {
    NetcraftClient::new(
        reqwest::Client::new(),
        server.uri(),
        "reporter@example.com",
        None,
    )
}

pub fn controller(
    store: Arc<SqliteSubmissionStore>,
    api: Arc<dyn ReportingApi>,
    settings: PipelineSettings,
) -> JobController {
    JobController::new(
        store,
        api,
        Arc::new(JobRegistry::new()),
        settings,
        Arc::new(ProcessingStats::new()),
    )
}

pub fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Receives every event of the job up to and including the terminal one.
pub async fn run_to_end(handle: JobHandle) -> Vec<JobEvent> {
    let JobHandle {
        mut events, task, ..
    } = handle;
    let mut seen = Vec::new();
    while let Ok(event) = events.recv().await {
        let done = event.is_terminal();
        seen.push(event);
        if done {
            break;
        }
    }
    task.await.expect("Job task panicked");
    seen
}

/// Totals of the job's `complete` event.
pub fn complete_totals(events: &[JobEvent]) -> JobTotals {
    match events.last() {
        Some(JobEvent::Complete { totals, .. }) => *totals,
        other => panic!("expected a complete event, got {other:?}"),
    }
}
