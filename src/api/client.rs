//! Reporting API client.
//!
//! `ReportingApi` is the seam the pipeline and the poller talk to;
//! `NetcraftClient` implements it over HTTP.

use async_trait::async_trait;
use log::debug;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::api::types::{
    ReportRequest, ReportResponse, SubmissionStatus, SubmissionUrl, SubmissionUrlsResponse,
    UrlEntry, UrlIdentifier, UrlIdentifiersRequest, UrlIdentifiersResponse,
};
use crate::config::{Config, HTTP_STATUS_TOO_MANY_REQUESTS};
use crate::error_handling::{ApiError, InitializationError};
use crate::initialization::init_client;

/// Operations of the remote reporting service.
#[async_trait]
pub trait ReportingApi: Send + Sync {
    /// Reports a batch of URLs and returns the batch submission identifier.
    async fn report_urls(&self, urls: &[String]) -> Result<String, ApiError>;

    /// Resolves per-URL identifiers for URLs of the batch `submission_id`.
    async fn url_identifiers(
        &self,
        submission_id: &str,
        urls: &[String],
    ) -> Result<Vec<UrlIdentifier>, ApiError>;

    /// Overall state of one submission.
    async fn submission_status(&self, submission_id: &str) -> Result<SubmissionStatus, ApiError>;

    /// Per-URL classification results of one submission.
    async fn submission_urls(
        &self,
        submission_id: &str,
        count: usize,
    ) -> Result<Vec<SubmissionUrl>, ApiError>;
}

/// HTTP client for the Netcraft reporting API (v3).
#[derive(Debug, Clone)]
pub struct NetcraftClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    api_key: Option<String>,
}

impl NetcraftClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            api_key,
        }
    }

    /// Builds a client from the library configuration.
    ///
    /// # Errors
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, InitializationError> {
        url::Url::parse(&config.api_base_url).map_err(|e| InitializationError::InvalidApiUrl {
            url: config.api_base_url.clone(),
            reason: e.to_string(),
        })?;
        let client = init_client(config)?;
        Ok(Self::new(
            client,
            config.api_base_url.clone(),
            config.email.clone(),
            config.api_key.clone(),
        ))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!("Undecodable API response ({status}): {body}");
            ApiError::MalformedBody(e.to_string())
        })
    }
}

/// Maps a non-2xx response to an `ApiError`.
///
/// The message is the body's `message` or `error` field when the body is JSON,
/// otherwise `HTTP <code>` followed by the raw body text.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
        return ApiError::RateLimited;
    }
    let text = response.text().await.unwrap_or_default();
    ApiError::Status {
        status: status.as_u16(),
        message: error_message(status.as_u16(), &text),
    }
}

fn error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = json.get(field).and_then(|v| v.as_str()) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

fn url_entries(urls: &[String]) -> Vec<UrlEntry<'_>> {
    urls.iter().map(|url| UrlEntry { url }).collect()
}

#[async_trait]
impl ReportingApi for NetcraftClient {
    async fn report_urls(&self, urls: &[String]) -> Result<String, ApiError> {
        let body = ReportRequest {
            email: &self.email,
            urls: url_entries(urls),
        };
        let request = self.client.post(self.endpoint("/report/urls")).json(&body);
        let response: ReportResponse = self.send(request).await?;
        if response.uuid.is_empty() {
            return Err(ApiError::MalformedBody("empty submission uuid".to_string()));
        }
        Ok(response.uuid)
    }

    async fn url_identifiers(
        &self,
        submission_id: &str,
        urls: &[String],
    ) -> Result<Vec<UrlIdentifier>, ApiError> {
        let body = UrlIdentifiersRequest {
            urls: url_entries(urls),
        };
        let request = self
            .client
            .post(self.endpoint(&format!("/submission/{submission_id}/url_uuids")))
            .json(&body);
        let response: UrlIdentifiersResponse = self.send(request).await?;
        Ok(response.urls)
    }

    async fn submission_status(&self, submission_id: &str) -> Result<SubmissionStatus, ApiError> {
        let request = self
            .client
            .get(self.endpoint(&format!("/submission/{submission_id}")));
        self.send(request).await
    }

    async fn submission_urls(
        &self,
        submission_id: &str,
        count: usize,
    ) -> Result<Vec<SubmissionUrl>, ApiError> {
        let request = self
            .client
            .get(self.endpoint(&format!("/submission/{submission_id}/urls")))
            .query(&[("count", count)]);
        let response: SubmissionUrlsResponse = self.send(request).await?;
        Ok(response.urls)
    }
}
