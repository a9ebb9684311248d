//! A full pass against the SQLite index and the file secret store

use crate::support::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use ticket_sync::connector::Collaborators;
use ticket_sync::session::handle;
use ticket_sync::storage::{FileSecretStore, ParameterStore, SqliteStorage, SyncJobStatus};
use ticket_sync::transport::ReqwestTransport;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "/rest/api/3/search/jql";

fn setup_backends() -> (TempDir, Arc<SqliteStorage>, Collaborators) {
    let dir = TempDir::new().unwrap();
    let secrets_path = dir.path().join("secrets.json");
    std::fs::write(
        &secrets_path,
        json!({ (SECRET_NAME): {"jiraId": "bot@acme.test", "jiraCredential": "tok"} }).to_string(),
    )
    .unwrap();

    let storage = Arc::new(SqliteStorage::new(&dir.path().join("index.db")).unwrap());
    let collaborators = Collaborators {
        index: storage.clone(),
        parameters: storage.clone(),
        secrets: Arc::new(FileSecretStore::new(&secrets_path)),
        events: storage.clone(),
        http: Arc::new(ReqwestTransport::with_defaults().unwrap()),
    };
    (dir, storage, collaborators)
}

#[tokio::test]
async fn test_pass_spanning_invocations_on_sqlite() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(first_page)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_page(
                    vec![
                        issue("OPS-1", "One", doc(vec![paragraph("first")])),
                        issue("OPS-2", "Two", doc(vec![paragraph("second")])),
                    ],
                    Some("p2"),
                ))
                .set_delay(Duration::from_millis(1200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("nextPageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            vec![issue("OPS-3", "Three", doc(vec![paragraph("third")]))],
            None,
        )))
        .mount(&server)
        .await;

    let (_dir, storage, collaborators) = setup_backends();
    let config = config(&server.uri(), 1);

    let mut response = handle(&trigger(), &config, &collaborators).await;
    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(storage.count_pending_events().unwrap(), 1);

    let job = storage.latest_job("ds-1", "idx-1").unwrap().unwrap();
    assert_eq!(job.status, SyncJobStatus::Running);

    // Drain the outbox the way the `run` command does
    let mut invocations = 1;
    while let Some(entry) = storage.next_pending_event().unwrap() {
        assert_eq!(entry.source, EVENT_SOURCE);
        invocations += 1;
        response = handle(&serde_json::to_value(&entry).unwrap(), &config, &collaborators).await;
        assert_eq!(response.status_code, 200, "{}", response.body);
    }

    assert_eq!(invocations, 2);
    assert_eq!(response.body, "jira indexing complete.");
    assert_eq!(storage.count_documents("idx-1").unwrap(), 3);

    let stored = storage.get_document("idx-1", "ISSUE-OPS-OPS-3").unwrap().unwrap();
    assert_eq!(stored.title, "Three");
    assert_eq!(stored.blob, "third");

    // The same job ran the whole pass and is now stopped
    let finished = storage.latest_job("ds-1", "idx-1").unwrap().unwrap();
    assert_eq!(finished.execution_id, job.execution_id);
    assert_eq!(finished.status, SyncJobStatus::Stopped);
    assert!(finished.stopped_at.is_some());

    let watermark = storage.get_parameter(WATERMARK).await.unwrap();
    assert!(watermark.parse::<f64>().unwrap() > 1_700_000_000.0);
}

#[tokio::test]
async fn test_missing_secret_file_fails_and_stops() {
    let server = MockServer::start().await;
    let (dir, storage, mut collaborators) = setup_backends();
    collaborators.secrets = Arc::new(FileSecretStore::new(dir.path().join("absent.json")));
    let config = config(&server.uri(), 480);

    let response = handle(&trigger(), &config, &collaborators).await;

    assert_eq!(response.status_code, 500);
    assert!(storage.latest_job("ds-1", "idx-1").unwrap().is_none());
    assert_eq!(storage.count_documents("idx-1").unwrap(), 0);
    assert!(storage.get_parameter(WATERMARK).await.is_err());
}
