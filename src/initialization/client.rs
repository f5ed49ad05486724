//! HTTP client initialization.
//!
//! This module builds the `reqwest::Client` shared by every call to the
//! reporting API.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, USER_AGENT};
use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for the reporting API.
///
/// Creates a `reqwest::Client` configured with:
/// - A per-request timeout from `Config::request_timeout_secs`
/// - The crate User-Agent
/// - Rustls TLS backend (no native TLS)
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &Config) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
