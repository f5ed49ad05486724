//! Job controller: starts, runs and cancels submission jobs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{error, info};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::ReportingApi;
use crate::config::{PipelineSettings, INVALID_URL_EXAMPLES, JOB_EVENT_CHANNEL_CAPACITY};
use crate::error_handling::ProcessingStats;
use crate::job::events::{JobEmitter, JobEvent, JobTotals, Stage};
use crate::job::registry::{JobRegistry, JobState};
use crate::pipeline::{
    deduplicate, persist_invalid, submit_all, validate_inputs, Halt, StageContext, StageResult,
};
use crate::storage::SubmissionStore;

/// A started job: its ID, its event stream and the task running it.
pub struct JobHandle {
    pub id: Uuid,
    /// Subscribed before the job started, so no event is missed
    pub events: broadcast::Receiver<JobEvent>,
    pub task: JoinHandle<()>,
}

/// How the pipeline of one job ended without being halted.
struct JobOutcome {
    totals: JobTotals,
    rate_limited: bool,
    not_submitted: usize,
}

/// Starts submission jobs and routes cancel requests to them.
///
/// Cloning is cheap; every clone shares the same store, API client, registry
/// and statistics.
#[derive(Clone)]
pub struct JobController {
    store: Arc<dyn SubmissionStore>,
    api: Arc<dyn ReportingApi>,
    registry: Arc<JobRegistry>,
    settings: PipelineSettings,
    stats: Arc<ProcessingStats>,
}

impl JobController {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        api: Arc<dyn ReportingApi>,
        registry: Arc<JobRegistry>,
        settings: PipelineSettings,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            store,
            api,
            registry,
            settings,
            stats,
        }
    }

    /// Starts a job over `inputs` on a new task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn submit(&self, inputs: Vec<String>) -> JobHandle {
        let id = Uuid::new_v4();
        let (tx, events) = broadcast::channel(JOB_EVENT_CHANNEL_CAPACITY);
        let cancel = self.registry.register(id, tx.clone());
        info!("Starting job {id} with {} inputs", inputs.len());

        let controller = self.clone();
        let task = tokio::spawn(async move { controller.run_job(id, tx, cancel, inputs).await });
        JobHandle { id, events, task }
    }

    /// Requests cancellation of a running job.
    ///
    /// Returns `false` if the job is unknown or already finished.
    pub fn cancel(&self, id: Uuid) -> bool {
        self.registry.cancel(id)
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Runs the pipeline and publishes exactly one terminal event.
    async fn run_job(
        self,
        id: Uuid,
        tx: broadcast::Sender<JobEvent>,
        cancel: CancellationToken,
        inputs: Vec<String>,
    ) {
        let mut emitter = JobEmitter::new(id, tx).with_registry(Arc::clone(&self.registry));
        let ctx = StageContext {
            store: self.store.as_ref(),
            api: self.api.as_ref(),
            settings: &self.settings,
            cancel: &cancel,
            stats: &self.stats,
        };

        let result = AssertUnwindSafe(run_pipeline(ctx, inputs, &mut emitter))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Halt::Fatal(anyhow::anyhow!("Job task panicked"))));

        let (state, event) = match result {
            Ok(outcome) => (JobState::Complete, complete_event(outcome)),
            Err(Halt::Cancelled) => {
                info!("Job {id} stopped on request");
                (JobState::Stopped, JobEvent::Stopped)
            }
            Err(Halt::Fatal(e)) => {
                error!("Job {id} failed: {e:#}");
                (
                    JobState::Errored,
                    JobEvent::Error {
                        message: format!("{e:#}"),
                    },
                )
            }
        };
        emitter.set_state(state);
        emitter.emit(event);
        self.registry.remove(id);
    }
}

fn complete_event(outcome: JobOutcome) -> JobEvent {
    let JobOutcome {
        totals,
        rate_limited,
        not_submitted,
    } = outcome;
    let message = rate_limited.then(|| {
        format!(
            "⚠️ Rate limit reached! Successfully reported {} URLs. {} URLs were not submitted.",
            totals.reported, not_submitted
        )
    });
    JobEvent::Complete {
        success: !rate_limited,
        totals,
        rate_limit_reached: rate_limited,
        message,
    }
}

/// Caps the input list, returning how many inputs were dropped.
fn cap_inputs(inputs: &mut Vec<String>, max: usize) -> usize {
    let excess = inputs.len().saturating_sub(max);
    inputs.truncate(max);
    excess
}

async fn run_pipeline(
    ctx: StageContext<'_>,
    inputs: Vec<String>,
    emitter: &mut JobEmitter,
) -> StageResult<JobOutcome> {
    let mut inputs: Vec<String> = inputs
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let received = inputs.len();
    let max = ctx.settings.max_urls_per_job.max(1);
    let excess = cap_inputs(&mut inputs, max);
    if excess > 0 {
        emitter.emit(JobEvent::UrlLimitWarning {
            total: received,
            processing: max,
            remaining: excess,
            message: format!(
                "Only the first {max} of {received} URLs are processed in this job. \
                 Submit the remaining {excess} URLs separately."
            ),
        });
    }
    let total = inputs.len();

    emitter.set_state(JobState::Validating);
    let validated = validate_inputs(ctx, &inputs, emitter).await?;
    let invalid = validated.invalid.len();
    if invalid > 0 {
        emitter.emit(JobEvent::InvalidUrls {
            count: invalid,
            urls: validated
                .invalid
                .iter()
                .take(INVALID_URL_EXAMPLES)
                .cloned()
                .collect(),
            message: format!("{invalid} invalid URL(s) will not be submitted"),
        });
        persist_invalid(ctx, &validated.invalid).await?;
    }

    emitter.set_state(JobState::Deduplicating);
    let dedup = deduplicate(ctx, validated.valid, emitter).await?;
    if dedup.fresh.is_empty() {
        emitter.progress(Stage::Filtering, "No new URLs to submit", 100.0);
    }

    let tally = submit_all(ctx, &dedup.fresh, emitter).await?;

    Ok(JobOutcome {
        totals: JobTotals {
            total,
            reported: tally.reported,
            skipped: dedup.skipped,
            failed: tally.failed,
            invalid,
        },
        rate_limited: tally.rate_limited,
        not_submitted: tally.not_submitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ApiError;
    use crate::pipeline::test_support::{fast_settings, server_error, FakeApi};
    use crate::storage::test_helpers::create_test_store;
    use crate::storage::{NewSubmission, SubmissionState};

    async fn controller_with(api: FakeApi, settings: PipelineSettings) -> JobController {
        let store: Arc<dyn SubmissionStore> = Arc::new(create_test_store().await);
        JobController::new(
            store,
            Arc::new(api),
            Arc::new(JobRegistry::new()),
            settings,
            Arc::new(ProcessingStats::new()),
        )
    }

    fn inputs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Collects events until the terminal one.
    async fn collect(handle: JobHandle) -> Vec<JobEvent> {
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
        task.await.unwrap();
        seen
    }

    fn totals_of(events: &[JobEvent]) -> JobTotals {
        match events.last() {
            Some(JobEvent::Complete { totals, .. }) => *totals,
            other => panic!("expected complete event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mixed_input_totals_balance() {
        let controller = controller_with(FakeApi::default(), fast_settings()).await;
        let handle =
            controller.submit(inputs(&["https://a.com", "a.com", "not a url", "ftp://x.com"]));
        let id = handle.id;

        let events = collect(handle).await;

        let totals = totals_of(&events);
        assert_eq!(
            totals,
            JobTotals {
                total: 4,
                reported: 1,
                skipped: 1,
                failed: 0,
                invalid: 2
            }
        );
        assert!(totals.is_balanced());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::InvalidUrls { count: 2, urls, .. } if urls == &inputs(&["not a url", "ftp://x.com"])
        )));
        assert!(controller.registry().status(id).is_none());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let controller = controller_with(FakeApi::default(), fast_settings()).await;
        let events = collect(controller.submit(inputs(&[
            "https://a.com",
            "https://b.com",
            "https://c.com",
        ])))
        .await;

        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[tokio::test]
    async fn test_input_cap_emits_warning() {
        let settings = PipelineSettings {
            max_urls_per_job: 2,
            ..fast_settings()
        };
        let controller = controller_with(FakeApi::default(), settings).await;
        let events = collect(controller.submit(inputs(&[
            "https://a.com",
            "https://b.com",
            "https://c.com",
        ])))
        .await;

        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::UrlLimitWarning {
                total: 3,
                processing: 2,
                remaining: 1,
                ..
            }
        )));
        assert_eq!(totals_of(&events).total, 2);
    }

    #[tokio::test]
    async fn test_blank_lines_are_not_counted() {
        let controller = controller_with(FakeApi::default(), fast_settings()).await;
        let events = collect(controller.submit(inputs(&["", "https://a.com", "   "]))).await;
        let totals = totals_of(&events);
        assert_eq!(totals.total, 1);
        assert_eq!(totals.reported, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_message_counts_only_unsubmitted_urls() {
        let api = FakeApi::default();
        api.push_report(Err(server_error()));
        api.push_report(Err(ApiError::RateLimited));
        let controller = controller_with(api, fast_settings()).await;

        let events = collect(controller.submit(inputs(&[
            "https://a.com",
            "https://b.com",
            "https://c.com",
        ])))
        .await;

        match events.last() {
            Some(JobEvent::Complete {
                totals, message, ..
            }) => {
                // Two failed in the first batch, one was never submitted
                assert_eq!(totals.failed, 3);
                assert_eq!(
                    message.as_deref(),
                    Some("⚠️ Rate limit reached! Successfully reported 0 URLs. 1 URLs were not submitted.")
                );
            }
            other => panic!("expected complete event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_job_completes_unsuccessfully() {
        let api = FakeApi::default();
        api.push_report(Err(ApiError::RateLimited));
        let controller = controller_with(api, fast_settings()).await;

        let events = collect(controller.submit(inputs(&["https://a.com", "https://b.com"]))).await;

        match events.last() {
            Some(JobEvent::Complete {
                success,
                totals,
                rate_limit_reached,
                message,
            }) => {
                assert!(!success);
                assert!(rate_limit_reached);
                assert_eq!(totals.failed, 2);
                assert!(totals.is_balanced());
                assert_eq!(
                    message.as_deref(),
                    Some("⚠️ Rate limit reached! Successfully reported 0 URLs. 2 URLs were not submitted.")
                );
            }
            other => panic!("expected complete event, got {other:?}"),
        }
        let rate_limits = events
            .iter()
            .filter(|e| matches!(e, JobEvent::RateLimit { .. }))
            .count();
        assert_eq!(rate_limits, 1);
    }

    #[tokio::test]
    async fn test_store_failure_during_dedup_is_an_error_event() {
        let store = create_test_store().await;
        sqlx::query("DROP TABLE submissions")
            .execute(&**store.pool())
            .await
            .unwrap();
        let controller = JobController::new(
            Arc::new(store),
            Arc::new(FakeApi::default()),
            Arc::new(JobRegistry::new()),
            fast_settings(),
            Arc::new(ProcessingStats::new()),
        );

        let events = collect(controller.submit(inputs(&["https://a.com"]))).await;

        assert!(matches!(events.last(), Some(JobEvent::Error { .. })));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_already_stored_urls_are_skipped() {
        let store = create_test_store().await;
        store
            .insert(&NewSubmission::pending("https://a.com/", "OLD"))
            .await
            .unwrap();
        let api = Arc::new(FakeApi::default());
        let controller = JobController::new(
            Arc::new(store),
            api.clone(),
            Arc::new(JobRegistry::new()),
            fast_settings(),
            Arc::new(ProcessingStats::new()),
        );

        let events = collect(controller.submit(inputs(&["a.com", "https://b.com"]))).await;

        let totals = totals_of(&events);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.reported, 1);
        assert_eq!(api.reported.lock().unwrap().clone(), vec![inputs(&["https://b.com/"])]);
    }

    #[tokio::test]
    async fn test_cancel_before_start_stops_job() {
        let controller = controller_with(FakeApi::default(), fast_settings()).await;
        let registry = Arc::clone(controller.registry());
        // The current-thread test runtime has not polled the job yet
        let handle = controller.submit(inputs(&["https://a.com"]));
        assert!(registry.cancel(handle.id));

        let events = collect(handle).await;

        assert_eq!(events.last(), Some(&JobEvent::Stopped));
        assert!(!events.iter().any(|e| matches!(e, JobEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_persisted_once() {
        let store = Arc::new(create_test_store().await);
        let controller = JobController::new(
            store.clone(),
            Arc::new(FakeApi::default()),
            Arc::new(JobRegistry::new()),
            fast_settings(),
            Arc::new(ProcessingStats::new()),
        );

        let events = collect(controller.submit(inputs(&["bad input", "bad input"]))).await;

        assert_eq!(totals_of(&events).invalid, 2);
        let record = store.find_by_url("bad input").await.unwrap().unwrap();
        assert_eq!(record.state, SubmissionState::Failed);
    }
}
