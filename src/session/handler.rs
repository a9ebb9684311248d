//! Top-level invocation handler
//!
//! Maps one inbound trigger to one bounded session and always returns a
//! response. On failure the index-side job is stopped exactly once: by the
//! session when it had a job open, otherwise best-effort here using only the
//! identifiers found in the trigger.

use crate::config::Config;
use crate::connector::{build_connector, Collaborators};
use crate::session::orchestrator::{SessionOutcome, SyncSession};
use crate::session::event::trigger_ids;
use crate::session::SyncEvent;
use crate::SyncError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Response returned for every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl InvocationResponse {
    fn new(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code,
            body,
            headers,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body.into())
    }

    pub fn failure(body: impl Into<String>) -> Self {
        Self::new(500, body.into())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

struct Failure {
    error: SyncError,
    job_stopped: bool,
}

impl From<SyncError> for Failure {
    fn from(error: SyncError) -> Self {
        Self {
            error,
            job_stopped: false,
        }
    }
}

/// Handles one trigger or continuation event
///
/// `event` is either the bare detail object or a bus envelope carrying it in
/// `detail`.
pub async fn handle(
    event: &Value,
    config: &Config,
    collaborators: &Collaborators,
) -> InvocationResponse {
    let started_at = Instant::now();
    tracing::info!("Received event: {}", event);

    match invoke(event, config, collaborators, started_at).await {
        Ok((name, SessionOutcome::Complete { .. })) => {
            let message = format!("{} indexing complete.", name);
            tracing::info!("{}", message);
            InvocationResponse::ok(message)
        }
        Ok((
            _,
            SessionOutcome::Continuing {
                next_page_token,
                event_id,
            },
        )) => InvocationResponse::ok(format!(
            "Invocation is continuing with next page token {:?}. Event bus receipt: {}",
            next_page_token, event_id
        )),
        Err(failure) => {
            tracing::error!("Error in invocation handler: {}", failure.error);
            if !failure.job_stopped {
                stop_from_trigger(event, collaborators).await;
            }
            InvocationResponse::failure(failure.error.to_string())
        }
    }
}

async fn invoke(
    raw: &Value,
    config: &Config,
    collaborators: &Collaborators,
    started_at: Instant,
) -> Result<(String, SessionOutcome), Failure> {
    let event = SyncEvent::from_value(raw.clone()).map_err(SyncError::from)?;
    let name = event.data_source_name.to_lowercase();

    let connector = build_connector(&event, config, collaborators).await?;
    let mut session = SyncSession::new(
        connector,
        event,
        collaborators.parameters.clone(),
        collaborators.events.clone(),
        &config.sync,
        started_at,
    );

    match session.run().await {
        Ok(outcome) => Ok((name, outcome)),
        Err(error) => Err(Failure {
            error,
            job_stopped: session.stop_attempted(),
        }),
    }
}

/// Best-effort stop using only the trigger's identifiers
async fn stop_from_trigger(raw: &Value, collaborators: &Collaborators) {
    match trigger_ids(raw) {
        Some((index_id, data_source_id)) => {
            if let Err(e) = collaborators
                .index
                .stop_sync_job(&data_source_id, &index_id)
                .await
            {
                tracing::warn!("Best-effort stop of sync job failed: {}", e);
            }
        }
        None => tracing::warn!("Trigger carries no index/data source id; nothing to stop"),
    }
}
