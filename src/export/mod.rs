//! Export of stored submissions.
//!
//! Submissions are read page by page from the store and written either as a
//! plain URL list or as CSV, to a file or to stdout.

mod csv;
mod queries;
mod text;
mod types;

use anyhow::Result;

use crate::storage::SubmissionStore;

pub use self::csv::export_csv;
pub use text::export_text;
pub use types::{ExportFormat, ExportOptions};

/// Exports the submissions selected by `opts`.
///
/// Returns the number of records exported.
pub async fn export_submissions(store: &dyn SubmissionStore, opts: &ExportOptions) -> Result<usize> {
    let output = queries::open_output(opts.output.as_deref())?;
    match opts.format {
        ExportFormat::Text => export_text(store, &opts.filter, opts.page_size, output).await,
        ExportFormat::Csv => export_csv(store, &opts.filter, opts.page_size, output).await,
    }
}
