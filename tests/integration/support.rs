//! Shared fixtures for integration tests

use serde_json::{json, Value};
use std::sync::Arc;
use ticket_sync::config::{parse_config, Config};
use ticket_sync::connector::Collaborators;
use ticket_sync::storage::MemoryStorage;
use ticket_sync::transport::ReqwestTransport;
use wiremock::Request;

pub const SECRET_NAME: &str = "jira/credentials";
pub const WATERMARK: &str = "ticket-sync/last-crawled";
pub const EVENT_SOURCE: &str = "ticket-sync.self-invoke";

/// base64("bot@acme.test:tok")
pub const AUTH_HEADER: &str = "Basic Ym90QGFjbWUudGVzdDp0b2s=";

/// Builds a validated configuration pointing Jira at `base_url`
pub fn config(base_url: &str, budget_secs: u64) -> Config {
    parse_config(&format!(
        r#"
[sync]
watermark-parameter = "{WATERMARK}"
continuation-source = "{EVENT_SOURCE}"
time-budget-secs = {budget_secs}
start-sync-attempts = 2

[retry]
total = 2
backoff-factor-ms = 1
max-backoff-ms = 10

[jira]
base-url = "{base_url}"
projects = ["OPS"]
secret-name = "{SECRET_NAME}"
page-size = 2
"#
    ))
    .expect("test config is valid")
}

pub fn credentials() -> &'static str {
    r#"{"jiraId":"bot@acme.test","jiraCredential":"tok"}"#
}

pub fn memory_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new().with_secret(SECRET_NAME, credentials()))
}

pub fn collaborators(storage: &Arc<MemoryStorage>) -> Collaborators {
    Collaborators {
        index: storage.clone(),
        parameters: storage.clone(),
        secrets: storage.clone(),
        events: storage.clone(),
        http: Arc::new(ReqwestTransport::with_defaults().expect("http client")),
    }
}

pub fn trigger() -> Value {
    json!({
        "source": "scheduler",
        "detail-type": "Scheduled Event",
        "detail": {
            "index_id": "idx-1",
            "data_source_name": "Jira",
            "data_source_id": "ds-1"
        }
    })
}

/// One Jira issue as returned by the search endpoint
pub fn issue(key: &str, summary: &str, description: Value) -> Value {
    json!({
        "id": "10001",
        "key": key,
        "fields": {
            "project": {"key": "OPS"},
            "summary": summary,
            "updated": "2024-05-01T10:00:00.000+0000",
            "description": description
        }
    })
}

pub fn paragraph(text: &str) -> Value {
    json!({"type": "paragraph", "content": [{"type": "text", "text": text}]})
}

pub fn doc(content: Vec<Value>) -> Value {
    json!({"type": "doc", "version": 1, "content": content})
}

pub fn search_page(issues: Vec<Value>, next: Option<&str>) -> Value {
    match next {
        Some(token) => json!({"issues": issues, "nextPageToken": token, "isLast": false}),
        None => json!({"issues": issues, "isLast": true}),
    }
}

/// Matches search requests that carry no page cursor
pub fn first_page(request: &Request) -> bool {
    !request
        .url
        .query_pairs()
        .any(|(key, _)| key == "nextPageToken")
}
