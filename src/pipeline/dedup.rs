//! Deduplication stage.
//!
//! The store lookup here is advisory: another job may insert the same URL
//! between this check and our insert, so the submit stage re-checks and
//! treats a uniqueness violation as "already reported".

use std::collections::HashSet;

use crate::job::{JobEmitter, Stage};
use crate::pipeline::{StageContext, StageResult};

/// URLs left to submit and how many inputs were skipped.
#[derive(Debug, Default, PartialEq)]
pub struct DedupOutcome {
    pub fresh: Vec<String>,
    /// Within-job duplicates plus URLs already in the store
    pub skipped: usize,
}

/// Drops repeated URLs, keeping the first occurrence. Returns the unique
/// URLs in input order and the number of dropped duplicates.
pub fn collapse_duplicates(urls: Vec<String>) -> (Vec<String>, usize) {
    let mut seen = HashSet::with_capacity(urls.len());
    let total = urls.len();
    let unique: Vec<String> = urls
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect();
    let duplicates = total - unique.len();
    (unique, duplicates)
}

/// Removes within-job duplicates and URLs already stored. Progress spans
/// 10 to 20%.
pub async fn deduplicate(
    ctx: StageContext<'_>,
    urls: Vec<String>,
    emitter: &mut JobEmitter,
) -> StageResult<DedupOutcome> {
    let (unique, duplicates) = collapse_duplicates(urls);
    emitter.progress(
        Stage::Filtering,
        format!("Checking {} URLs for earlier submissions...", unique.len()),
        10.0,
    );

    let chunk_size = ctx.settings.dedup_lookup_chunk.max(1);
    let total_chunks = unique.len().div_ceil(chunk_size).max(1);
    let mut fresh = Vec::with_capacity(unique.len());
    let mut already_stored = 0;

    for (i, chunk) in unique.chunks(chunk_size).enumerate() {
        ctx.check_cancelled()?;
        let existing = ctx.store.find_existing(chunk).await?;
        ctx.check_cancelled()?;

        already_stored += existing.len();
        fresh.extend(chunk.iter().filter(|url| !existing.contains(*url)).cloned());

        let checked = (i * chunk_size + chunk.len()).min(unique.len());
        emitter.progress(
            Stage::Filtering,
            format!("Checked {checked}/{} URLs", unique.len()),
            10.0 + (i + 1) as f64 / total_chunks as f64 * 10.0,
        );
    }

    Ok(DedupOutcome {
        fresh,
        skipped: duplicates + already_stored,
    })
}
