//! Plain-text export: one URL per line.

use anyhow::{Context, Result};
use std::io::Write;

use super::queries::for_each_page;
use crate::storage::{SubmissionFilter, SubmissionStore};

/// Writes the URL of every submission matching `filter`, one per line.
///
/// Returns the number of URLs exported.
pub async fn export_text<W: Write>(
    store: &dyn SubmissionStore,
    filter: &SubmissionFilter,
    page_size: usize,
    mut output: W,
) -> Result<usize> {
    let count = for_each_page(store, filter, page_size, |page| {
        for record in page {
            writeln!(output, "{}", record.url).context("Failed to write URL")?;
        }
        Ok(())
    })
    .await?;

    output.flush().context("Failed to flush output")?;
    Ok(count)
}
