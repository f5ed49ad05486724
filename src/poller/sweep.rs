use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;

use crate::api::{tag_labels, ReportingApi, SubmissionUrl};
use crate::config::{PollerSettings, MAX_REMOTE_BATCH_SIZE};
use crate::error_handling::{
    update_error_stats, DatabaseError, ErrorType, InfoType, ProcessingStats,
};
use crate::pipeline::urls_match;
use crate::storage::{SubmissionRecord, SubmissionState, SubmissionStore};

/// Result of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Records whose state or tags were written
    pub updated: usize,
    /// Unresolved records found in the store
    pub total_checked: usize,
    /// Identifier groups processed
    pub batches: usize,
}

/// A classification to write to one record.
#[derive(Debug, Clone, PartialEq)]
struct Update {
    url: String,
    state: SubmissionState,
    tags: Vec<String>,
}

/// Polls the reporting API and writes classifications back to the store.
pub struct StatusPoller {
    store: Arc<dyn SubmissionStore>,
    api: Arc<dyn ReportingApi>,
    settings: PollerSettings,
    stats: Arc<ProcessingStats>,
}

/// Pairs each remote result with the stored record it describes.
///
/// An exact URL match wins; otherwise a single trailing slash is ignored.
/// Results without a matching record are dropped.
pub fn match_results<'a>(
    records: &'a [SubmissionRecord],
    results: &'a [SubmissionUrl],
) -> Vec<(&'a SubmissionRecord, &'a SubmissionUrl)> {
    results
        .iter()
        .filter_map(|result| {
            records
                .iter()
                .find(|record| record.url == result.url)
                .or_else(|| records.iter().find(|record| urls_match(&record.url, &result.url)))
                .map(|record| (record, result))
        })
        .collect()
}

impl StatusPoller {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        api: Arc<dyn ReportingApi>,
        settings: PollerSettings,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            store,
            api,
            settings,
            stats,
        }
    }

    /// Runs one sweep over all unresolved records.
    ///
    /// A failing group is logged and skipped; only store reads abort the sweep.
    pub async fn run(&self) -> Result<SweepReport, DatabaseError> {
        let records = self.load_unresolved().await?;
        let mut report = SweepReport {
            total_checked: records.len(),
            ..Default::default()
        };
        if records.is_empty() {
            info!("No unresolved submissions to check");
            return Ok(report);
        }

        let mut groups: BTreeMap<String, Vec<SubmissionRecord>> = BTreeMap::new();
        for record in records {
            if let Some(identifier) = record.identifier.clone() {
                groups.entry(identifier).or_default().push(record);
            }
        }
        info!(
            "Checking {} submissions in {} groups",
            report.total_checked,
            groups.len()
        );

        let group_count = groups.len();
        for (index, (identifier, group)) in groups.iter().enumerate() {
            report.batches += 1;
            report.updated += self.check_group(identifier, group).await;

            if index + 1 < group_count && !self.settings.group_delay.is_zero() {
                tokio::time::sleep(self.settings.group_delay).await;
            }
        }

        info!(
            "Sweep finished: {} updated, {} checked, {} groups",
            report.updated, report.total_checked, report.batches
        );
        Ok(report)
    }

    async fn load_unresolved(&self) -> Result<Vec<SubmissionRecord>, DatabaseError> {
        let page_size = self.settings.page_size.max(1);
        let mut all = Vec::new();
        loop {
            let page = self.store.list_unresolved(all.len(), page_size).await?;
            let last_page = page.len() < page_size;
            all.extend(page);
            if last_page {
                break;
            }
        }
        Ok(all)
    }

    /// Checks one identifier group and returns the number of updated records.
    ///
    /// A batch group is often only the unresolved remainder of a larger remote
    /// batch, so the whole batch listing is requested, never the group size.
    async fn check_group(&self, identifier: &str, group: &[SubmissionRecord]) -> usize {
        let results = match self
            .api
            .submission_urls(identifier, MAX_REMOTE_BATCH_SIZE)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                update_error_stats(&self.stats, &e);
                warn!("Skipping group {identifier}: {e}");
                return 0;
            }
        };

        let updates: Vec<Update> = match_results(group, &results)
            .into_iter()
            .filter_map(|(record, result)| {
                if record.url != result.url {
                    self.stats.increment_info(InfoType::TrailingSlashMatch);
                }
                let state = self.parse_state(&result.url_state)?;
                Some(Update {
                    url: record.url.clone(),
                    state,
                    tags: tag_labels(&result.tags),
                })
            })
            .collect();

        // Only a per-URL submission lists no URLs; a batch-wide status must
        // never be written onto one of its records.
        if results.is_empty() && group.len() == 1 {
            return self.check_single_submission(identifier).await;
        }
        self.apply_updates(identifier, &updates).await
    }

    fn parse_state(&self, remote: &str) -> Option<SubmissionState> {
        match SubmissionState::from_str(remote) {
            Ok(state) => Some(state),
            Err(_) => {
                self.stats.increment_error(ErrorType::UnknownRemoteState);
                debug!("Ignoring unknown remote state '{remote}'");
                None
            }
        }
    }

    /// Falls back to the submission status endpoint for a group holding a
    /// single record under its own per-URL identifier.
    async fn check_single_submission(&self, identifier: &str) -> usize {
        self.stats.increment_info(InfoType::SubmissionStatusFallback);
        let status = match self.api.submission_status(identifier).await {
            Ok(status) => status,
            Err(e) => {
                update_error_stats(&self.stats, &e);
                warn!("Status lookup for {identifier} failed: {e}");
                return 0;
            }
        };
        let Some(state) = self.parse_state(&status.state) else {
            return 0;
        };
        match self
            .store
            .update_by_identifier(identifier, state, &tag_labels(&status.tags))
            .await
        {
            Ok(updated) => updated as usize,
            Err(e) => {
                self.stats.increment_error(ErrorType::StoreUpdateError);
                warn!("Failed to update submissions under {identifier}: {e}");
                0
            }
        }
    }

    /// Writes updates in bounded concurrent chunks. After the first failing
    /// chunk, the rest of the group (failed entries included) is written one
    /// at a time.
    async fn apply_updates(&self, identifier: &str, updates: &[Update]) -> usize {
        let chunk_size = self.settings.update_concurrency.max(1);
        let mut updated = 0;

        let mut position = 0;
        while position < updates.len() {
            let end = (position + chunk_size).min(updates.len());
            let chunk = &updates[position..end];
            let results = join_all(chunk.iter().map(|update| {
                self.store
                    .update_classification(&update.url, update.state, &update.tags)
            }))
            .await;

            let failed: Vec<&Update> = chunk
                .iter()
                .zip(&results)
                .filter(|(_, result)| result.is_err())
                .map(|(update, _)| update)
                .collect();
            updated += results
                .iter()
                .filter(|result| matches!(result, Ok(true)))
                .count();
            position = end;

            if !failed.is_empty() {
                for _ in &failed {
                    self.stats.increment_error(ErrorType::StoreUpdateError);
                }
                warn!(
                    "{} concurrent updates failed in group {identifier}; continuing sequentially",
                    failed.len()
                );
                let rest = failed.into_iter().chain(updates[position..].iter());
                updated += self.apply_sequentially(rest).await;
                break;
            }
        }
        updated
    }

    async fn apply_sequentially<'a>(&self, updates: impl Iterator<Item = &'a Update>) -> usize {
        let mut updated = 0;
        for update in updates {
            match self
                .store
                .update_classification(&update.url, update.state, &update.tags)
                .await
            {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    self.stats.increment_error(ErrorType::StoreUpdateError);
                    warn!("Failed to update {}: {e}", update.url);
                }
            }
        }
        updated
    }
}
