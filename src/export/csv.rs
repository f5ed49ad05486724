//! CSV export functionality.
//!
//! One row per stored URL: `url,identifier,state,tags,error,reported_at`.
//! Tags are joined with `;`, timestamps are RFC 3339.

use anyhow::{Context, Result};
use csv::Writer;
use std::io::Write;

use super::queries::for_each_page;
use crate::storage::{SubmissionFilter, SubmissionRecord, SubmissionStore};

const HEADER: [&str; 6] = ["url", "identifier", "state", "tags", "error", "reported_at"];

fn csv_row(record: &SubmissionRecord) -> [String; 6] {
    [
        record.url.clone(),
        record.identifier.clone().unwrap_or_default(),
        record.state.to_string(),
        record.tags.join(";"),
        record.error.clone().unwrap_or_default(),
        record.reported_at.to_rfc3339(),
    ]
}

/// Exports the submissions matching `filter` as CSV.
///
/// Returns the number of records exported.
pub async fn export_csv<W: Write>(
    store: &dyn SubmissionStore,
    filter: &SubmissionFilter,
    page_size: usize,
    output: W,
) -> Result<usize> {
    let mut writer = Writer::from_writer(output);
    writer
        .write_record(HEADER)
        .context("Failed to write CSV header")?;

    let count = for_each_page(store, filter, page_size, |page| {
        for record in page {
            writer
                .write_record(csv_row(record))
                .with_context(|| format!("Failed to write CSV row for {}", record.url))?;
        }
        Ok(())
    })
    .await?;

    writer.flush().context("Failed to flush CSV output")?;
    Ok(count)
}
