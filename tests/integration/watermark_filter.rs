//! Change-filter construction from the stored watermark

use crate::support::*;
use serde_json::json;
use std::sync::Arc;
use ticket_sync::session::handle;
use ticket_sync::storage::MemoryStorage;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "/rest/api/3/search/jql";
const MYSELF: &str = "/rest/api/3/myself";

/// 2024-05-01T10:02:00Z
const SEEDED: &str = "1714557720";

fn seeded_storage() -> Arc<MemoryStorage> {
    Arc::new(
        MemoryStorage::new()
            .with_secret(SECRET_NAME, credentials())
            .with_parameter(WATERMARK, SEEDED),
    )
}

#[tokio::test]
async fn test_incremental_filter_uses_profile_timezone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MYSELF))
        .and(header("Authorization", AUTH_HEADER))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accountId": "abc", "timeZone": "Europe/Berlin"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Watermark minus the two minute buffer, rendered in Berlin summer time
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param(
            "jql",
            r#"project IN ("OPS") AND updated > "2024/05/01 12:00""#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            vec![issue("OPS-9", "Changed", doc(vec![paragraph("body")]))],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let storage = seeded_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(storage.documents().len(), 1);

    let advanced: f64 = storage.parameter(WATERMARK).unwrap().parse().unwrap();
    assert!(advanced > 1_714_557_720.0);
}

#[tokio::test]
async fn test_profile_is_looked_up_once_per_invocation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MYSELF))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timeZone": "UTC"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("nextPageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param(
            "jql",
            r#"project IN ("OPS") AND updated > "2024/05/01 10:00""#,
        ))
        .and(first_page)
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            vec![issue("OPS-1", "One", doc(vec![paragraph("a")]))],
            Some("p2"),
        )))
        .mount(&server)
        .await;

    let storage = seeded_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    let searches = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == SEARCH)
        .count();
    assert_eq!(searches, 2);
}

#[tokio::test]
async fn test_full_crawl_skips_profile_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MYSELF))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timeZone": "UTC"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("jql", r#"project IN ("OPS")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert!(storage.documents().is_empty());
    assert!(storage.parameter(WATERMARK).is_some());
}

#[tokio::test]
async fn test_profile_failure_stops_job_and_keeps_watermark() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MYSELF))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let storage = seeded_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.to_lowercase().contains("timezone"), "{}", response.body);
    assert_eq!(storage.start_count(), 1);
    assert_eq!(storage.stop_count(), 1);
    assert_eq!(storage.parameter(WATERMARK).as_deref(), Some(SEEDED));
}

#[tokio::test]
async fn test_corrupt_watermark_fails_before_start() {
    let server = MockServer::start().await;
    let storage = Arc::new(
        MemoryStorage::new()
            .with_secret(SECRET_NAME, credentials())
            .with_parameter(WATERMARK, "yesterday"),
    );
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains(WATERMARK), "{}", response.body);
    assert_eq!(storage.start_count(), 0);
    assert_eq!(storage.stop_count(), 1);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
