//! End-to-end invocation scenarios against a mock Jira server

use crate::support::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use ticket_sync::connector::{AttributeValue, ATTR_SOURCE_URI, ATTR_SYNC_JOB_EXECUTION_ID};
use ticket_sync::session::{handle, SyncEvent};
use ticket_sync::storage::{MemoryStorage, StoreCall};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SEARCH: &str = "/rest/api/3/search/jql";

async fn mount_page(server: &MockServer, token: Option<&str>, body: serde_json::Value) {
    let mock = Mock::given(method("GET")).and(path(SEARCH));
    let mock = match token {
        Some(token) => mock.and(query_param("nextPageToken", token)),
        None => mock.and(first_page),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn search_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == SEARCH)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_with_nested_list_completes() {
    let server = MockServer::start().await;
    let description = doc(vec![json!({
        "type": "bulletList",
        "content": [
            {"type": "listItem", "content": [
                paragraph("outer"),
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [paragraph("inner")]}
                ]}
            ]}
        ]
    })]);

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("Authorization", AUTH_HEADER))
        .and(query_param("jql", r#"project IN ("OPS")"#))
        .and(query_param("maxResults", "2"))
        .and(first_page)
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            vec![issue("OPS-1", "Nested", description)],
            Some("p2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, Some("p2"), search_page(vec![], None)).await;

    let storage = memory_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(response.body, "jira indexing complete.");

    let documents = storage.documents();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.id, "ISSUE-OPS-OPS-1");
    assert!(document.blob.contains("- outer"));
    assert!(document.blob.contains("- inner"));
    assert!(document.has_provenance());
    assert_eq!(
        document.attribute(ATTR_SOURCE_URI).map(AttributeValue::as_str),
        Some(format!("{}/browse/OPS-1", server.uri()).as_str())
    );

    // Page 2 carried no documents, so only one submit call was made
    assert_eq!(storage.batch_sizes(), vec![1]);

    let watermark: f64 = storage
        .parameter(WATERMARK)
        .expect("watermark persisted")
        .parse()
        .unwrap();
    assert!(watermark > 1_700_000_000.0);

    assert_eq!(storage.start_count(), 1);
    assert_eq!(storage.stop_count(), 1);
    assert!(storage.events().is_empty());

    // No watermark existed, so no profile lookup was needed
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().all(|r| r.url.path() == SEARCH));
}

#[tokio::test]
async fn test_budget_exhaustion_continues_then_resumes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(first_page)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_page(
                    vec![issue("OPS-1", "One", doc(vec![paragraph("first")]))],
                    Some("p2"),
                ))
                .set_delay(Duration::from_millis(1200)),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        Some("p2"),
        search_page(
            vec![issue("OPS-2", "Two", doc(vec![paragraph("second")]))],
            Some("p3"),
        ),
    )
    .await;
    mount_page(
        &server,
        Some("p3"),
        search_page(vec![issue("OPS-3", "Three", doc(vec![paragraph("third")]))], None),
    )
    .await;

    let storage = memory_storage();
    let config = config(&server.uri(), 1);
    let collaborators = collaborators(&storage);

    // First invocation: page 1 eats the whole budget
    let response = handle(&trigger(), &config, &collaborators).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert!(response.body.contains("event-1"));
    assert_eq!(storage.documents().len(), 1);
    assert!(storage.parameter(WATERMARK).is_none());
    assert_eq!(storage.stop_count(), 0);

    let events = storage.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, EVENT_SOURCE);
    assert_eq!(events[0].detail_type, "SelfInvocation");

    let continuation = SyncEvent::from_json(&events[0].detail).unwrap();
    assert_eq!(continuation.next_page_token.as_deref(), Some("p2"));
    assert_eq!(continuation.job_execution_id.as_deref(), Some("exec-1"));
    assert_eq!(continuation.index_id, "idx-1");
    assert_eq!(continuation.data_source_id, "ds-1");

    // Second invocation: the redelivered event finishes the pass on the same job
    let redelivered = serde_json::to_value(&events[0]).unwrap();
    let response = handle(&redelivered, &config, &collaborators).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(response.body, "jira indexing complete.");
    assert_eq!(storage.start_count(), 1);
    assert_eq!(storage.stop_count(), 1);
    assert_eq!(storage.events().len(), 1);
    assert!(storage.parameter(WATERMARK).is_some());

    let mut ids: Vec<String> = storage.documents().into_iter().map(|d| d.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["ISSUE-OPS-OPS-1", "ISSUE-OPS-OPS-2", "ISSUE-OPS-OPS-3"]);

    // Every document of the pass belongs to the one job
    assert!(storage.documents().iter().all(|d| d
        .attribute(ATTR_SYNC_JOB_EXECUTION_ID)
        .map(AttributeValue::as_str)
        == Some("exec-1")));
}

#[tokio::test]
async fn test_fetch_failure_after_retries_stops_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timeZone": "UTC"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let storage = Arc::new(
        MemoryStorage::new()
            .with_secret(SECRET_NAME, credentials())
            .with_parameter(WATERMARK, "1714557720"),
    );
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("503"), "{}", response.body);
    assert!(response.body.contains("maintenance"));

    // One attempt plus two retries
    assert_eq!(search_requests(&server).await.len(), 3);

    assert_eq!(storage.stop_count(), 1);
    assert_eq!(storage.parameter(WATERMARK).as_deref(), Some("1714557720"));
    assert!(storage.documents().is_empty());
    assert!(storage.events().is_empty());
}

#[tokio::test]
async fn test_non_transient_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let storage = memory_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(search_requests(&server).await.len(), 1);
    assert_eq!(storage.stop_count(), 1);
    assert!(storage.parameter(WATERMARK).is_none());
}

#[tokio::test]
async fn test_empty_description_falls_back_to_title() {
    let server = MockServer::start().await;
    let empty = doc(vec![json!({"type": "paragraph", "content": [{"type": "hardBreak"}]})]);

    mount_page(
        &server,
        None,
        search_page(
            vec![
                issue("OPS-4", "Title only", empty),
                issue("OPS-5", "No description", serde_json::Value::Null),
            ],
            None,
        ),
    )
    .await;

    let storage = memory_storage();
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators(&storage)).await;
    assert_eq!(response.status_code, 200, "{}", response.body);

    let documents = storage.documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].blob, "Title only");
    assert_eq!(documents[1].blob, "No description");
}

#[tokio::test]
async fn test_unknown_source_never_touches_jira() {
    let server = MockServer::start().await;
    let storage = memory_storage();
    let config = config(&server.uri(), 480);
    let trigger = json!({"detail": {
        "index_id": "idx-1", "data_source_name": "confluence", "data_source_id": "ds-1"
    }});

    let response = handle(&trigger, &config, &collaborators(&storage)).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("Invalid data source selected: confluence"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(!storage
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::StartSync { .. })));
    assert_eq!(storage.stop_count(), 1);
}
