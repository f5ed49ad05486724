//! Shared plumbing for the export formats: output selection and paging.

use anyhow::{Context, Result};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use crate::storage::{SubmissionFilter, SubmissionRecord, SubmissionStore};

/// Wrapper around a Write that ignores broken pipe errors (EPIPE).
/// This allows graceful handling when stdout is piped to a command that exits early.
pub(crate) struct IgnoreBrokenPipe<W: Write> {
    inner: W,
}

impl<W: Write> IgnoreBrokenPipe<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for IgnoreBrokenPipe<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).or_else(|e| {
            if e.kind() == ErrorKind::BrokenPipe {
                // Downstream command closed the pipe
                Ok(buf.len())
            } else {
                Err(e)
            }
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().or_else(|e| {
            if e.kind() == ErrorKind::BrokenPipe {
                Ok(())
            } else {
                Err(e)
            }
        })
    }
}

/// Opens the export destination: the given file, or stdout.
pub(crate) fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(IgnoreBrokenPipe::new(io::stdout()))),
    }
}

/// Pages through every record matching `filter`, handing each page to `write_page`.
///
/// Returns the number of records visited.
pub(crate) async fn for_each_page<F>(
    store: &dyn SubmissionStore,
    filter: &SubmissionFilter,
    page_size: usize,
    mut write_page: F,
) -> Result<usize>
where
    F: FnMut(&[SubmissionRecord]) -> Result<()>,
{
    let page_size = page_size.max(1);
    let mut offset = 0;
    loop {
        let page = store
            .list(filter, offset, page_size)
            .await
            .with_context(|| format!("Failed to read submissions at offset {offset}"))?;
        write_page(&page)?;
        offset += page.len();
        if page.len() < page_size {
            break;
        }
    }
    Ok(offset)
}
