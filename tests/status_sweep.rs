//! Reconciliation sweeps against a mocked reporting API.

mod helpers;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{client_for, temp_store};
use netcraft_reporter::{
    NewSubmission, PollerSettings, ProcessingStats, SqliteSubmissionStore, StatusPoller,
    SubmissionState, SubmissionStore, SweepReport,
};

fn poller(server: &MockServer, store: Arc<SqliteSubmissionStore>) -> StatusPoller {
    StatusPoller::new(
        store,
        Arc::new(client_for(server)),
        PollerSettings {
            page_size: 2,
            group_delay: Duration::ZERO,
            update_concurrency: 2,
        },
        Arc::new(ProcessingStats::new()),
    )
}

async fn seed(store: &SqliteSubmissionStore, rows: &[(&str, &str)]) {
    for (url, identifier) in rows {
        store
            .insert(&NewSubmission::pending(*url, *identifier))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_sweep_applies_results_and_status_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/B1/urls"))
        .and(query_param("count", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": [
                {"url": "https://a.com", "url_state": "malicious", "tags": [{"name": "credited"}]},
                {"url": "https://b.com/", "url_state": "no threats", "tags": ["reviewed"]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submission/U1/urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"urls": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submission/U1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "suspicious", "tags": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, store) = temp_store().await;
    seed(
        &store,
        &[
            ("https://a.com/", "B1"),
            ("https://b.com/", "B1"),
            ("https://c.com/", "U1"),
        ],
    )
    .await;

    let report = poller(&server, store.clone()).run().await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            updated: 3,
            total_checked: 3,
            batches: 2
        }
    );
    let a = store.find_by_url("https://a.com/").await.unwrap().unwrap();
    assert_eq!(a.state, SubmissionState::Malicious);
    assert_eq!(a.tags, vec!["credited".to_string()]);
    let b = store.find_by_url("https://b.com/").await.unwrap().unwrap();
    assert_eq!(b.state, SubmissionState::NoThreats);
    assert_eq!(b.tags, vec!["reviewed".to_string()]);
    let c = store.find_by_url("https://c.com/").await.unwrap().unwrap();
    assert_eq!(c.state, SubmissionState::Suspicious);
    assert!(c.tags.is_empty());

    // Everything is terminal now; the next sweep has nothing to do
    let again = poller(&server, store.clone()).run().await.unwrap();
    assert_eq!(again, SweepReport::default());
}

#[tokio::test]
async fn test_failing_group_does_not_abort_sweep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/B1/urls"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submission/B2/urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": [{"url": "https://c.com/", "url_state": "processing", "tags": []}]
        })))
        .mount(&server)
        .await;

    let (_dir, store) = temp_store().await;
    seed(
        &store,
        &[
            ("https://a.com/", "B1"),
            ("https://b.com/", "B1"),
            ("https://c.com/", "B2"),
            ("https://d.com/", "B2"),
        ],
    )
    .await;

    let report = poller(&server, store.clone()).run().await.unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.total_checked, 4);
    assert_eq!(report.updated, 1);
    let a = store.find_by_url("https://a.com/").await.unwrap().unwrap();
    assert_eq!(a.state, SubmissionState::Pending);
    // Still non-terminal: checked again on the next sweep
    let c = store.find_by_url("https://c.com/").await.unwrap().unwrap();
    assert_eq!(c.state, SubmissionState::Processing);
}

#[tokio::test]
async fn test_terminal_records_are_never_overwritten() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/B1/urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": [{"url": "https://a.com/", "url_state": "processing", "tags": []}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, store) = temp_store().await;
    seed(&store, &[("https://a.com/", "B1")]).await;
    store
        .update_classification("https://a.com/", SubmissionState::Malicious, &[])
        .await
        .unwrap();

    let report = poller(&server, store.clone()).run().await.unwrap();

    assert_eq!(report.total_checked, 0);
    let a = store.find_by_url("https://a.com/").await.unwrap().unwrap();
    assert_eq!(a.state, SubmissionState::Malicious);
}

#[tokio::test]
async fn test_partial_batch_group_uses_its_own_url_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/B1/urls"))
        .and(query_param("count", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": [
                {"url": "https://a.com/", "url_state": "malicious", "tags": []},
                {"url": "https://b.com/", "url_state": "suspicious", "tags": []}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submission/B1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "malicious", "tags": []})),
        )
        .expect(0)
        .mount(&server)
        .await;

    // a.com moved to its own identifier; only b.com is left under the batch
    let (_dir, store) = temp_store().await;
    seed(&store, &[("https://b.com/", "B1")]).await;

    let report = poller(&server, store.clone()).run().await.unwrap();

    assert_eq!(report.updated, 1);
    let b = store.find_by_url("https://b.com/").await.unwrap().unwrap();
    assert_eq!(b.state, SubmissionState::Suspicious);
}

#[tokio::test]
async fn test_batch_listing_without_the_record_leaves_it_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/B1/urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": [{"url": "https://a.com/", "url_state": "malicious", "tags": []}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submission/B1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "malicious", "tags": []})),
        )
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, store) = temp_store().await;
    seed(&store, &[("https://b.com/", "B1")]).await;

    let report = poller(&server, store.clone()).run().await.unwrap();

    assert_eq!(report.updated, 0);
    let b = store.find_by_url("https://b.com/").await.unwrap().unwrap();
    assert_eq!(b.state, SubmissionState::Pending);
}
