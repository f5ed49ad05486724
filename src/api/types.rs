//! Wire types of the reporting API.
//!
//! Response types are lenient: missing optional fields default instead of
//! failing the whole response, since the pipeline only needs a few of them.

use serde::{Deserialize, Deserializer, Serialize};

/// `{ "url": ... }` entry used by both request bodies.
#[derive(Debug, Serialize)]
pub(crate) struct UrlEntry<'a> {
    pub url: &'a str,
}

/// Body of `POST /report/urls`.
#[derive(Debug, Serialize)]
pub(crate) struct ReportRequest<'a> {
    pub email: &'a str,
    pub urls: Vec<UrlEntry<'a>>,
}

/// Body of `POST /submission/{uuid}/url_uuids`.
#[derive(Debug, Serialize)]
pub(crate) struct UrlIdentifiersRequest<'a> {
    pub urls: Vec<UrlEntry<'a>>,
}

/// Response of `POST /report/urls`.
#[derive(Debug, Deserialize)]
pub(crate) struct ReportResponse {
    pub uuid: String,
}

/// Response of `POST /submission/{uuid}/url_uuids`.
#[derive(Debug, Deserialize)]
pub(crate) struct UrlIdentifiersResponse {
    #[serde(default)]
    pub urls: Vec<UrlIdentifier>,
}

/// Per-URL identifier lookup result.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UrlIdentifier {
    #[serde(default)]
    pub data: UrlData,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UrlData {
    #[serde(default)]
    pub url: String,
}

/// Response of `GET /submission/{uuid}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubmissionStatus {
    pub state: String,
    #[serde(default, deserialize_with = "tags_or_empty")]
    pub tags: Vec<Tag>,
}

/// Response of `GET /submission/{uuid}/urls`.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionUrlsResponse {
    #[serde(default)]
    pub urls: Vec<SubmissionUrl>,
}

/// Classification result of one URL within a submission.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubmissionUrl {
    pub url: String,
    pub url_state: String,
    #[serde(default, deserialize_with = "tags_or_empty")]
    pub tags: Vec<Tag>,
}

/// A classification tag as returned by the API.
///
/// Tags arrive either as objects carrying a `name` or as bare strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Tag {
    Named { name: String },
    Plain(String),
    Other(serde_json::Value),
}

impl Tag {
    /// The tag's label, if it has a non-empty one.
    pub fn label(&self) -> Option<&str> {
        match self {
            Tag::Named { name } | Tag::Plain(name) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Extracts the non-empty labels of `tags`, in order.
pub fn tag_labels(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .filter_map(Tag::label)
        .map(str::to_string)
        .collect()
}

/// Accepts a tag array; `null` or any non-array value yields no tags.
fn tags_or_empty<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| serde_json::from_value(item.clone()).unwrap_or(Tag::Other(item)))
            .collect()),
        _ => Ok(Vec::new()),
    }
}
