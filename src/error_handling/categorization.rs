//! Error categorization and retry strategy.
//!
//! This module maps remote and storage failures onto `ErrorType` counters and
//! builds the retry strategy used for identifier lookups.

use std::time::Duration;
use tokio_retry::strategy::FixedInterval;

use super::stats::ProcessingStats;
use super::types::{ApiError, ErrorType};

/// Creates a fixed-interval retry strategy.
///
/// The iterator yields `retries` delays of `delay` each, so
/// `tokio_retry::Retry` makes at most `retries + 1` attempts in total.
pub fn get_retry_strategy(retries: usize, delay: Duration) -> impl Iterator<Item = Duration> {
    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    FixedInterval::from_millis(millis).take(retries)
}

/// Categorizes a `reqwest::Error` into an `ErrorType`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status.as_u16());
    }

    if error.is_timeout() {
        ErrorType::ApiTimeout
    } else if error.is_connect() {
        ErrorType::ApiConnectError
    } else if error.is_decode() {
        ErrorType::ApiMalformedResponse
    } else {
        ErrorType::ApiTransportError
    }
}

/// Categorizes an HTTP status code returned by the API.
pub fn categorize_status(status: u16) -> ErrorType {
    match status {
        401 | 403 => ErrorType::ApiUnauthorized,
        404 => ErrorType::ApiNotFound,
        429 => ErrorType::ApiRateLimited,
        400..=499 => ErrorType::ApiClientError,
        _ => ErrorType::ApiServerError,
    }
}

/// Categorizes an `ApiError` into an `ErrorType`.
pub fn categorize_api_error(error: &ApiError) -> ErrorType {
    match error {
        ApiError::RateLimited => ErrorType::ApiRateLimited,
        ApiError::Status { status, .. } => categorize_status(*status),
        ApiError::Transport(e) => categorize_reqwest_error(e),
        ApiError::MalformedBody(_) => ErrorType::ApiMalformedResponse,
    }
}

/// Updates processing statistics based on an `ApiError`.
pub fn update_error_stats(stats: &ProcessingStats, error: &ApiError) {
    stats.increment_error(categorize_api_error(error));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_strategy_yields_fixed_delays() {
        let delays: Vec<Duration> = get_retry_strategy(3, Duration::from_millis(250)).collect();
        assert_eq!(delays.len(), 3);
        assert!(delays.iter().all(|d| *d == Duration::from_millis(250)));
    }

    #[test]
    fn test_retry_strategy_zero_retries() {
        assert_eq!(get_retry_strategy(0, Duration::from_secs(5)).count(), 0);
    }

    #[test]
    fn test_categorize_status() {
        assert_eq!(categorize_status(401), ErrorType::ApiUnauthorized);
        assert_eq!(categorize_status(403), ErrorType::ApiUnauthorized);
        assert_eq!(categorize_status(404), ErrorType::ApiNotFound);
        assert_eq!(categorize_status(429), ErrorType::ApiRateLimited);
        assert_eq!(categorize_status(422), ErrorType::ApiClientError);
        assert_eq!(categorize_status(503), ErrorType::ApiServerError);
    }

    #[test]
    fn test_categorize_api_error() {
        assert_eq!(
            categorize_api_error(&ApiError::RateLimited),
            ErrorType::ApiRateLimited
        );
        assert_eq!(
            categorize_api_error(&ApiError::MalformedBody("missing uuid".into())),
            ErrorType::ApiMalformedResponse
        );
        assert_eq!(
            categorize_api_error(&ApiError::Status {
                status: 500,
                message: "HTTP 500".into()
            }),
            ErrorType::ApiServerError
        );
    }

    #[test]
    fn test_update_error_stats_increments_category() {
        let stats = ProcessingStats::new();
        update_error_stats(&stats, &ApiError::RateLimited);
        update_error_stats(
            &stats,
            &ApiError::Status {
                status: 404,
                message: "not found".into(),
            },
        );
        assert_eq!(stats.get_error_count(ErrorType::ApiRateLimited), 1);
        assert_eq!(stats.get_error_count(ErrorType::ApiNotFound), 1);
        assert_eq!(stats.total_errors(), 2);
    }
}
