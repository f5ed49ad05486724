//! Submission record types.
//!
//! A submission is keyed by its canonical URL. The `identifier` groups records
//! into the remote batch they were reported in until a per-URL identifier is
//! resolved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Classification state of a submission.
///
/// The string forms match the states reported by the remote API
/// (`url_state` / `state` fields), so they are parsed directly from responses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, Serialize,
)]
pub enum SubmissionState {
    #[strum(serialize = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[strum(serialize = "processing")]
    #[serde(rename = "processing")]
    Processing,
    #[strum(serialize = "no threats")]
    #[serde(rename = "no threats")]
    NoThreats,
    #[strum(serialize = "suspicious")]
    #[serde(rename = "suspicious")]
    Suspicious,
    #[strum(serialize = "malicious")]
    #[serde(rename = "malicious")]
    Malicious,
    #[strum(serialize = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
    #[strum(serialize = "unavailable")]
    #[serde(rename = "unavailable")]
    Unavailable,
    #[strum(serialize = "failed")]
    #[serde(rename = "failed")]
    Failed,
}

impl SubmissionState {
    /// States after which no further polling is expected.
    pub const TERMINAL: [SubmissionState; 6] = [
        SubmissionState::NoThreats,
        SubmissionState::Suspicious,
        SubmissionState::Malicious,
        SubmissionState::Rejected,
        SubmissionState::Unavailable,
        SubmissionState::Failed,
    ];

    /// States that the status poller still has to resolve.
    pub const NON_TERMINAL: [SubmissionState; 2] =
        [SubmissionState::Pending, SubmissionState::Processing];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Pending | SubmissionState::Processing)
    }
}

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub url: String,
    pub identifier: Option<String>,
    pub state: SubmissionState,
    pub tags: Vec<String>,
    pub error: Option<String>,
    pub reported_at: DateTime<Utc>,
}

/// A row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub url: String,
    pub identifier: Option<String>,
    pub state: SubmissionState,
    pub error: Option<String>,
}

impl NewSubmission {
    /// A URL accepted by the remote API under `identifier`.
    pub fn pending(url: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            identifier: Some(identifier.into()),
            state: SubmissionState::Pending,
            error: None,
        }
    }

    /// A URL that could not be reported.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            identifier: None,
            state: SubmissionState::Failed,
            error: Some(error.into()),
        }
    }
}

/// Result of inserting a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The URL was already stored; nothing was written.
    AlreadyExists,
}

/// Filter for listing stored submissions.
///
/// Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub states: Vec<SubmissionState>,
    pub tag: Option<String>,
    pub identifier: Option<String>,
}

impl SubmissionFilter {
    pub fn with_state(mut self, state: SubmissionState) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}
