//! Input validation stage.

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::{INVALID_URL_REASON, VALIDATION_PROGRESS_INTERVAL};
use crate::error_handling::ErrorType;
use crate::job::{JobEmitter, Stage};
use crate::pipeline::normalize::normalize_url;
use crate::pipeline::{StageContext, StageResult};
use crate::storage::NewSubmission;

/// Inputs split into canonical URLs and rejected raw strings.
///
/// Both keep one entry per input occurrence, in input order.
#[derive(Debug, Default, PartialEq)]
pub struct ValidatedInput {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Normalizes every input. Progress spans 0 to 10%.
pub async fn validate_inputs(
    ctx: StageContext<'_>,
    inputs: &[String],
    emitter: &mut JobEmitter,
) -> StageResult<ValidatedInput> {
    let total = inputs.len();
    let mut result = ValidatedInput::default();
    emitter.progress(Stage::Validating, format!("Validating {total} URLs..."), 0.0);

    for (i, raw) in inputs.iter().enumerate() {
        ctx.check_cancelled()?;
        match normalize_url(raw) {
            Ok(url) => result.valid.push(url),
            Err(reason) => {
                debug!("Rejected input '{raw}': {reason}");
                result.invalid.push(raw.trim().to_string());
            }
        }

        if (i + 1) % VALIDATION_PROGRESS_INTERVAL == 0 {
            emitter.progress(
                Stage::Validating,
                format!("Validated {}/{total} URLs", i + 1),
                (i + 1) as f64 / total as f64 * 10.0,
            );
            // Let a pending cancel request run on single-threaded runtimes
            tokio::task::yield_now().await;
        }
    }

    emitter.progress(
        Stage::Validating,
        format!(
            "{} valid, {} invalid URLs",
            result.valid.len(),
            result.invalid.len()
        ),
        10.0,
    );
    Ok(result)
}

/// Stores each distinct rejected input once as a failed record.
///
/// Store errors are logged and counted, never fatal: the inputs are
/// reported as invalid either way.
pub async fn persist_invalid(ctx: StageContext<'_>, invalid: &[String]) -> StageResult<usize> {
    let mut seen = HashSet::new();
    let mut stored = 0;
    for raw in invalid {
        if !seen.insert(raw.as_str()) {
            continue;
        }
        ctx.check_cancelled()?;
        match ctx
            .store
            .insert(&NewSubmission::failed(raw.as_str(), INVALID_URL_REASON))
            .await
        {
            Ok(_) => stored += 1,
            Err(e) => {
                ctx.stats.increment_error(ErrorType::StoreInsertError);
                warn!("Failed to record invalid input '{raw}': {e}");
            }
        }
    }
    Ok(stored)
}
