//! Error type definitions.
//!
//! This module defines the typed errors used at module seams (initialization,
//! storage, remote API) plus the error and info categories counted by
//! `ProcessingStats`.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The configured API base URL cannot be parsed.
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Error applying schema migrations.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored row holds a value the application cannot interpret.
    #[error("Corrupt row for {url}: {reason}")]
    CorruptRow { url: String, reason: String },
}

/// Errors returned by the remote reporting API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 429: the reporting quota is exhausted.
    #[error("Rate limit reached")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Network-level failure (DNS, connect, timeout, TLS, ...).
    #[error("Request failed: {0}")]
    Transport(#[from] ReqwestError),

    /// A 2xx response whose body does not have the documented shape.
    #[error("Malformed response body: {0}")]
    MalformedBody(String),
}

impl ApiError {
    /// Whether this is the fail-fast rate limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

/// Types of errors counted while running jobs and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // Remote API
    ApiRateLimited,
    ApiTimeout,
    ApiConnectError,
    ApiTransportError,
    ApiUnauthorized,
    ApiNotFound,
    ApiClientError,
    ApiServerError,
    ApiMalformedResponse,
    // Reconciliation
    IdentifierLookupExhausted,
    UnknownRemoteState,
    // Storage
    StoreInsertError,
    StoreUpdateError,
}

/// Types of informational metrics counted while running jobs and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// A URL received a per-URL identifier distinct from its batch identifier
    IdentifierResolved,
    /// The API did not know a URL yet when identifiers were requested
    IdentifierNotYetFound,
    /// Insert raced with another job and found the URL already stored
    ConcurrentInsert,
    /// A poll result matched its record only after ignoring a trailing slash
    TrailingSlashMatch,
    /// The single-submission status endpoint was used for a group
    SubmissionStatusFallback,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ApiRateLimited => "API rate limit (429)",
            ErrorType::ApiTimeout => "API request timeout",
            ErrorType::ApiConnectError => "API connect error",
            ErrorType::ApiTransportError => "API transport error",
            ErrorType::ApiUnauthorized => "API unauthorized (401/403)",
            ErrorType::ApiNotFound => "API not found (404)",
            ErrorType::ApiClientError => "API client error (4xx)",
            ErrorType::ApiServerError => "API server error (5xx)",
            ErrorType::ApiMalformedResponse => "API malformed response",
            ErrorType::IdentifierLookupExhausted => "Identifier lookup retries exhausted",
            ErrorType::UnknownRemoteState => "Unknown remote state",
            ErrorType::StoreInsertError => "Store insert error",
            ErrorType::StoreUpdateError => "Store update error",
        }
    }
}

impl InfoType {
    /// Returns a human-readable string representation of the info type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::IdentifierResolved => "Per-URL identifier resolved",
            InfoType::IdentifierNotYetFound => "URL not yet known to the API",
            InfoType::ConcurrentInsert => "URL inserted concurrently",
            InfoType::TrailingSlashMatch => "Trailing-slash URL match",
            InfoType::SubmissionStatusFallback => "Submission status fallback",
        }
    }
}
