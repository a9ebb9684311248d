//! Bounded-invocation orchestrator
//!
//! One [`SyncSession`] drives one invocation:
//! 1. Opens (or resumes) the index-side sync job
//! 2. Pulls pages and submits their documents until the source is exhausted
//!    or the time budget is spent
//! 3. On exhaustion, advances the watermark and stops the job
//! 4. On budget exhaustion, emits a continuation event and leaves the job open
//!
//! Any failure after the job is open stops the job before the error is
//! returned.

use crate::config::SyncConfig;
use crate::connector::Connector;
use crate::session::watermark::{write_watermark, Watermark};
use crate::session::{SessionState, SyncEvent};
use crate::storage::{EventBus, ParameterStore};
use crate::SyncError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How an invocation that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The pass finished in this invocation
    Complete { documents: usize },

    /// The pass continues in the invocation triggered by `event_id`
    Continuing {
        next_page_token: Option<String>,
        event_id: String,
    },
}

/// State of one bounded invocation
pub struct SyncSession {
    connector: Connector,
    event: SyncEvent,
    parameters: Arc<dyn ParameterStore>,
    events: Arc<dyn EventBus>,
    watermark_parameter: String,
    continuation_source: String,
    budget: Duration,
    started_at: Instant,
    state: SessionState,
    stop_attempted: bool,
    pages: usize,
    documents: usize,
}

impl SyncSession {
    /// Creates a session; `started_at` is when the invocation began
    pub fn new(
        connector: Connector,
        event: SyncEvent,
        parameters: Arc<dyn ParameterStore>,
        events: Arc<dyn EventBus>,
        config: &SyncConfig,
        started_at: Instant,
    ) -> Self {
        Self {
            connector,
            event,
            parameters,
            events,
            watermark_parameter: config.watermark_parameter.clone(),
            continuation_source: config.continuation_source.clone(),
            budget: Duration::from_secs(config.time_budget_secs),
            started_at,
            state: SessionState::NotStarted,
            stop_attempted: false,
            pages: 0,
            documents: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once this session has tried to stop the index-side job
    pub fn stop_attempted(&self) -> bool {
        self.stop_attempted
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.connector.execution_id()
    }

    /// Runs the invocation to a terminal state
    pub async fn run(&mut self) -> Result<SessionOutcome, SyncError> {
        if let Err(e) = self.connector.start_sync().await {
            self.state = SessionState::Failed;
            return Err(e);
        }
        self.transition(SessionState::Syncing)?;

        match self.sync_pages().await {
            Ok(SessionOutcome::Complete { documents }) => {
                self.stop_attempted = true;
                if let Err(e) = self.connector.stop_sync().await {
                    self.state = SessionState::Failed;
                    return Err(e);
                }
                self.transition(SessionState::Complete)?;
                tracing::info!(
                    "{} pass complete: {} documents over {} pages",
                    self.connector.source_name(),
                    documents,
                    self.pages
                );
                Ok(SessionOutcome::Complete { documents })
            }
            Ok(outcome) => {
                self.transition(SessionState::Continuing)?;
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Page loop; returns before the job is stopped
    async fn sync_pages(&mut self) -> Result<SessionOutcome, SyncError> {
        let mut page_token = self.event.next_page_token.clone();

        loop {
            let elapsed = self.started_at.elapsed();
            if elapsed >= self.budget {
                tracing::info!(
                    "Time budget of {:?} exhausted after {:?} ({} pages this invocation)",
                    self.budget,
                    elapsed,
                    self.pages
                );
                break;
            }

            let (documents, next_page_token) =
                self.connector.get_documents(page_token.as_deref()).await?;
            self.connector.submit_documents(&documents).await?;

            self.pages += 1;
            self.documents += documents.len();
            page_token = next_page_token;

            if self.connector.is_sync_done() {
                write_watermark(
                    self.parameters.as_ref(),
                    &self.watermark_parameter,
                    Watermark::now(),
                )
                .await?;
                return Ok(SessionOutcome::Complete {
                    documents: self.documents,
                });
            }
        }

        let event_id = self.emit_continuation(page_token.clone()).await?;
        Ok(SessionOutcome::Continuing {
            next_page_token: page_token,
            event_id,
        })
    }

    async fn emit_continuation(&self, page_token: Option<String>) -> Result<String, SyncError> {
        let next = self.event.continuation(
            page_token,
            self.connector.execution_id().map(str::to_string),
        );
        let entry = next.to_entry(&self.continuation_source)?;

        let event_id = self
            .events
            .put_event(&entry)
            .await
            .map_err(SyncError::Continuation)?;

        tracing::info!(
            "Continuing with next page token {:?} (event {})",
            next.next_page_token,
            event_id
        );
        Ok(event_id)
    }

    /// Stops the job and returns `error`; a failed stop is only logged
    async fn fail(&mut self, error: SyncError) -> SyncError {
        tracing::error!("Sync failed: {}", error);
        self.state = SessionState::Failed;
        self.stop_attempted = true;
        if let Err(stop_error) = self.connector.stop_sync().await {
            tracing::warn!("Failed to stop sync job after error: {}", stop_error);
        }
        error
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SyncError> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Session {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
