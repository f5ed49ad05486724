//! Remote reporting API.
//!
//! Endpoints used:
//! - `POST /report/urls` reports a batch and returns its submission uuid
//! - `POST /submission/{uuid}/url_uuids` resolves per-URL uuids of a batch
//! - `GET /submission/{uuid}` returns the state of one submission
//! - `GET /submission/{uuid}/urls?count=N` returns per-URL classifications

mod client;
mod types;

pub use client::{NetcraftClient, ReportingApi};
pub use types::{tag_labels, SubmissionStatus, SubmissionUrl, Tag, UrlData, UrlIdentifier};
