//! Per-URL identifier resolution.
//!
//! A fresh batch is known remotely only by its batch identifier. After the
//! service had time to process it, each URL's own identifier is fetched and
//! stored in place of the batch identifier. URLs the service does not know
//! yet keep the batch identifier; the status poller resolves them later.

use log::{debug, warn};
use tokio_retry::RetryIf;

use crate::error_handling::{get_retry_strategy, ApiError, ErrorType, InfoType};
use crate::pipeline::normalize::urls_match;
use crate::pipeline::{StageContext, StageResult};

/// What a resolution pass achieved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// URLs whose identifier was replaced
    pub resolved: usize,
    /// URLs the service reported as not found or without own identifier
    pub unresolved: usize,
    /// Every lookup attempt failed
    pub lookup_failed: bool,
}

/// Resolves per-URL identifiers for `urls`, all stored under `batch_id`.
///
/// Failed lookups are retried with a fixed delay; running out of attempts
/// is not an error and leaves the batch identifier in place.
pub async fn resolve_identifiers(
    ctx: StageContext<'_>,
    batch_id: &str,
    urls: &[String],
) -> StageResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    if urls.is_empty() {
        return Ok(report);
    }

    ctx.pause(ctx.settings.identifier_fetch_wait).await?;

    let strategy = get_retry_strategy(
        ctx.settings.identifier_fetch_retries,
        ctx.settings.identifier_fetch_retry_delay,
    );
    let lookup = RetryIf::spawn(
        strategy,
        move || {
            debug!("Requesting per-URL identifiers for batch {batch_id}");
            ctx.api.url_identifiers(batch_id, urls)
        },
        move |e: &ApiError| {
            warn!("Identifier lookup for batch {batch_id} failed: {e}");
            !ctx.cancel.is_cancelled()
        },
    )
    .await;
    ctx.check_cancelled()?;

    let identifiers = match lookup {
        Ok(identifiers) => identifiers,
        Err(e) => {
            ctx.stats
                .increment_error(ErrorType::IdentifierLookupExhausted);
            warn!("Keeping batch identifier {batch_id} for {} URLs: {e}", urls.len());
            report.lookup_failed = true;
            report.unresolved = urls.len();
            return Ok(report);
        }
    };

    for entry in identifiers {
        let own_id = entry
            .uuid
            .as_deref()
            .filter(|id| entry.found && !id.is_empty() && *id != batch_id);
        let Some(own_id) = own_id else {
            ctx.stats.increment_info(InfoType::IdentifierNotYetFound);
            report.unresolved += 1;
            continue;
        };
        let Some(url) = urls.iter().find(|url| urls_match(url, &entry.data.url)) else {
            debug!(
                "Identifier lookup returned unknown URL {} for batch {batch_id}",
                entry.data.url
            );
            continue;
        };

        ctx.check_cancelled()?;
        match ctx.store.update_identifier(url, batch_id, own_id).await {
            Ok(true) => {
                ctx.stats.increment_info(InfoType::IdentifierResolved);
                report.resolved += 1;
            }
            Ok(false) => report.unresolved += 1,
            Err(e) => {
                ctx.stats.increment_error(ErrorType::StoreUpdateError);
                warn!("Failed to store identifier {own_id} for {url}: {e}");
                report.unresolved += 1;
            }
        }
    }

    Ok(report)
}
