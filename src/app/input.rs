//! URL list input.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Extracts URL lines, skipping blank lines and `#` comments.
pub fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<String>> {
    let mut lines = BufReader::new(reader).lines();
    let mut urls = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read input line")? {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            urls.push(trimmed.to_string());
        }
    }
    Ok(urls)
}

/// Reads URLs from `path`, or from stdin when `path` is `-`.
pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let urls = if path.as_os_str() == "-" {
        info!("Reading URLs from stdin");
        read_lines(tokio::io::stdin()).await?
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        read_lines(file).await?
    };
    info!("Read {} URLs", urls.len());
    Ok(urls)
}
