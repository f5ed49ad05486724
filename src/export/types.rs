//! Export types and options.

use std::path::PathBuf;

use crate::config::EXPORT_PAGE_SIZE;
use crate::storage::SubmissionFilter;

/// Export format options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// One URL per line
    Text,
    /// Full records, one row per URL
    Csv,
}

/// Options for exporting stored submissions.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Output file path (or stdout if None)
    pub output: Option<PathBuf>,
    /// Export format
    pub format: ExportFormat,
    /// Which submissions to export
    pub filter: SubmissionFilter,
    /// Rows fetched from the store per query
    pub page_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output: None,
            format: ExportFormat::Text,
            filter: SubmissionFilter::default(),
            page_size: EXPORT_PAGE_SIZE,
        }
    }
}
