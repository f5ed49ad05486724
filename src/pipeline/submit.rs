//! Batch submission stage.
//!
//! Chunks are reported strictly one after another with a pause in between;
//! at most one report call per job is in flight at any time.

use std::collections::HashSet;

use log::{info, warn};

use crate::config::RATE_LIMIT_REASON;
use crate::error_handling::{update_error_stats, ErrorType, InfoType};
use crate::job::{JobEmitter, JobEvent, JobState, Stage};
use crate::pipeline::reconcile::resolve_identifiers;
use crate::pipeline::{StageContext, StageResult};
use crate::storage::{InsertOutcome, NewSubmission};

/// Outcome counts of the submission stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTally {
    pub reported: usize,
    pub failed: usize,
    pub rate_limited: bool,
    /// URLs left unreported when the rate limit hit
    pub not_submitted: usize,
}

/// Share of the job's progress bar owned by this stage.
const PROGRESS_START: f64 = 20.0;
const PROGRESS_SPAN: f64 = 80.0;

fn chunk_progress(done: f64, total_chunks: usize) -> f64 {
    PROGRESS_START + done / total_chunks as f64 * PROGRESS_SPAN
}

/// Stores every URL as failed with `error`. Returns how many were already
/// stored by another job; those are not failures of this one.
async fn record_failures(ctx: StageContext<'_>, urls: &[String], error: &str) -> usize {
    let mut already_stored = 0;
    for url in urls {
        match ctx
            .store
            .insert(&NewSubmission::failed(url.as_str(), error))
            .await
        {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyExists) => {
                ctx.stats.increment_info(InfoType::ConcurrentInsert);
                already_stored += 1;
            }
            Err(e) => {
                ctx.stats.increment_error(ErrorType::StoreInsertError);
                warn!("Failed to record failure for {url}: {e}");
            }
        }
    }
    already_stored
}

/// Reports `urls` in chunks, persists the results and resolves per-URL
/// identifiers of each accepted chunk. Progress spans 20 to 100%.
///
/// A rate-limited chunk ends the stage: it and every later chunk are stored
/// as failed and a `rate-limit` event is published. Any other report failure
/// only fails its own chunk.
pub async fn submit_all(
    ctx: StageContext<'_>,
    urls: &[String],
    emitter: &mut JobEmitter,
) -> StageResult<SubmissionTally> {
    let mut tally = SubmissionTally::default();
    if urls.is_empty() {
        return Ok(tally);
    }

    let batch_size = ctx.settings.effective_batch_size();
    let total_chunks = urls.len().div_ceil(batch_size);

    for (index, chunk) in urls.chunks(batch_size).enumerate() {
        let batch_num = index + 1;
        let offset = index * batch_size;
        ctx.check_cancelled()?;

        emitter.set_state(JobState::Submitting);
        emitter.progress(
            Stage::Submitting,
            format!(
                "Submitting batch {batch_num}/{total_chunks} ({} URLs)...",
                chunk.len()
            ),
            chunk_progress(index as f64, total_chunks),
        );

        let batch_id = match ctx.api.report_urls(chunk).await {
            Ok(batch_id) => batch_id,
            Err(e) if e.is_rate_limited() => {
                update_error_stats(ctx.stats, &e);
                let remaining = &urls[offset..];
                let already_stored = record_failures(ctx, remaining, RATE_LIMIT_REASON).await;
                tally.reported += already_stored;
                tally.failed += remaining.len() - already_stored;
                tally.rate_limited = true;
                tally.not_submitted = remaining.len();
                emitter.emit(JobEvent::RateLimit {
                    message: "Rate limit reached on Netcraft API. Please try again after some time."
                        .to_string(),
                    processed: offset,
                    total: urls.len(),
                    remaining: remaining.len(),
                });
                return Ok(tally);
            }
            Err(e) => {
                update_error_stats(ctx.stats, &e);
                let error = e.to_string();
                let already_stored = record_failures(ctx, chunk, &error).await;
                tally.reported += already_stored;
                tally.failed += chunk.len() - already_stored;
                emitter.emit(JobEvent::BatchError {
                    batch_num,
                    total_batches: total_chunks,
                    message: format!("Batch {batch_num}/{total_chunks} failed: {error}"),
                    error,
                });
                ctx.check_cancelled()?;
                if batch_num < total_chunks {
                    ctx.pause(ctx.settings.inter_batch_delay).await?;
                }
                continue;
            }
        };

        // The remote side has accepted the chunk: store it before honoring a
        // cancel request so the records match what was reported.
        emitter.progress(
            Stage::Storing,
            format!("Storing {} URLs under batch {batch_id}...", chunk.len()),
            chunk_progress(index as f64 + 0.5, total_chunks),
        );
        // Closes the window since deduplication; the insert below still
        // catches anything that slips past this check.
        let already_stored = match ctx.store.find_existing(chunk).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Re-check before storing batch {batch_num} failed: {e}");
                HashSet::new()
            }
        };
        let mut stored = Vec::with_capacity(chunk.len());
        for url in chunk {
            if already_stored.contains(url) {
                tally.reported += 1;
                continue;
            }
            match ctx
                .store
                .insert(&NewSubmission::pending(url.as_str(), batch_id.as_str()))
                .await
            {
                Ok(InsertOutcome::Inserted) => {
                    tally.reported += 1;
                    stored.push(url.clone());
                }
                Ok(InsertOutcome::AlreadyExists) => {
                    ctx.stats.increment_info(InfoType::ConcurrentInsert);
                    tally.reported += 1;
                }
                Err(e) => {
                    ctx.stats.increment_error(ErrorType::StoreInsertError);
                    warn!("Failed to store reported URL {url}: {e}");
                    tally.failed += 1;
                }
            }
        }
        info!(
            "Batch {batch_num}/{total_chunks}: {} URLs stored under {batch_id}",
            stored.len()
        );
        ctx.check_cancelled()?;

        emitter.set_state(JobState::Reconciling);
        emitter.progress(
            Stage::Resolving,
            format!("Resolving per-URL identifiers for batch {batch_num}/{total_chunks}..."),
            chunk_progress(index as f64 + 0.75, total_chunks),
        );
        resolve_identifiers(ctx, &batch_id, &stored).await?;

        emitter.progress(
            Stage::Storing,
            format!("Batch {batch_num}/{total_chunks} done"),
            chunk_progress(batch_num as f64, total_chunks),
        );

        if batch_num < total_chunks {
            ctx.pause(ctx.settings.inter_batch_delay).await?;
        }
    }

    Ok(tally)
}
