//! Shared fixtures for pipeline and poller unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{ReportingApi, SubmissionStatus, SubmissionUrl, UrlData, UrlIdentifier};
use crate::config::PipelineSettings;
use crate::error_handling::{ApiError, ProcessingStats};
use crate::job::{JobEmitter, JobEvent};
use crate::pipeline::StageContext;
use crate::storage::test_helpers::create_test_store;
use crate::storage::SqliteSubmissionStore;

/// Scripted `ReportingApi`.
///
/// Queued results are consumed in order; an empty report queue answers with
/// `B<n>` batch identifiers and an empty identifier queue with "not found".
#[derive(Default)]
pub struct FakeApi {
    pub report_results: Mutex<VecDeque<Result<String, ApiError>>>,
    pub identifier_results: Mutex<VecDeque<Result<Vec<UrlIdentifier>, ApiError>>>,
    pub submission_urls: Mutex<HashMap<String, Vec<SubmissionUrl>>>,
    pub failing_groups: Mutex<Vec<String>>,
    pub statuses: Mutex<HashMap<String, SubmissionStatus>>,
    pub reported: Mutex<Vec<Vec<String>>>,
    pub identifier_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl FakeApi {
    pub fn push_report(&self, result: Result<String, ApiError>) {
        self.report_results.lock().unwrap().push_back(result);
    }

    pub fn push_identifiers(&self, result: Result<Vec<UrlIdentifier>, ApiError>) {
        self.identifier_results.lock().unwrap().push_back(result);
    }

    pub fn report_calls(&self) -> usize {
        self.reported.lock().unwrap().len()
    }
}

pub fn found(url: &str, uuid: &str) -> UrlIdentifier {
    UrlIdentifier {
        data: UrlData {
            url: url.to_string(),
        },
        found: true,
        uuid: Some(uuid.to_string()),
    }
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "HTTP 500: boom".to_string(),
    }
}

#[async_trait]
impl ReportingApi for FakeApi {
    async fn report_urls(&self, urls: &[String]) -> Result<String, ApiError> {
        let call = {
            let mut reported = self.reported.lock().unwrap();
            reported.push(urls.to_vec());
            reported.len()
        };
        self.report_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("B{call}")))
    }

    async fn url_identifiers(
        &self,
        _submission_id: &str,
        _urls: &[String],
    ) -> Result<Vec<UrlIdentifier>, ApiError> {
        self.identifier_calls.fetch_add(1, Ordering::SeqCst);
        self.identifier_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submission_status(&self, submission_id: &str) -> Result<SubmissionStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(submission_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "HTTP 404".to_string(),
            })
    }

    async fn submission_urls(
        &self,
        submission_id: &str,
        _count: usize,
    ) -> Result<Vec<SubmissionUrl>, ApiError> {
        if self
            .failing_groups
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == submission_id)
        {
            return Err(server_error());
        }
        Ok(self
            .submission_urls
            .lock()
            .unwrap()
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Pipeline settings without delays or retries.
pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        batch_size: 2,
        inter_batch_delay: Duration::ZERO,
        identifier_fetch_wait: Duration::ZERO,
        identifier_fetch_retries: 0,
        identifier_fetch_retry_delay: Duration::ZERO,
        ..Default::default()
    }
}

/// Store, fake API and settings for driving stages directly.
pub struct TestHarness {
    pub store: SqliteSubmissionStore,
    pub api: FakeApi,
    pub settings: PipelineSettings,
    pub cancel: CancellationToken,
    pub stats: ProcessingStats,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self {
            store: create_test_store().await,
            api: FakeApi::default(),
            settings: fast_settings(),
            cancel: CancellationToken::new(),
            stats: ProcessingStats::new(),
        }
    }

    pub fn ctx(&self) -> StageContext<'_> {
        StageContext {
            store: &self.store,
            api: &self.api,
            settings: &self.settings,
            cancel: &self.cancel,
            stats: &self.stats,
        }
    }

    pub fn emitter(&self) -> JobEmitter {
        self.emitter_with_events().0
    }

    pub fn emitter_with_events(&self) -> (JobEmitter, broadcast::Receiver<JobEvent>) {
        let (tx, rx) = broadcast::channel(256);
        (JobEmitter::new(Uuid::new_v4(), tx), rx)
    }
}

/// Drains every event currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
