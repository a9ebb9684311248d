//! Source connectors
//!
//! A [`Connector`] couples one [`Source`] (query construction, page fetching
//! and record mapping for a single external API) to the index-side sync job
//! lifecycle. The session orchestrator drives it one page at a time.

mod document;
mod jira;
mod registry;

pub use document::{
    AttributeValue, ContentType, DocumentAttribute, DocumentContext, IndexDocument,
    ATTR_DATA_SOURCE_ID, ATTR_LAST_UPDATED_AT, ATTR_SOURCE_URI, ATTR_SYNC_JOB_EXECUTION_ID,
};
pub use jira::{JiraCredentials, JiraSource};
pub use registry::{build_connector, Collaborators, SourceKind};

use crate::config::SyncConfig;
use crate::session::Watermark;
use crate::storage::{IndexService, StoreError};
use crate::transport::{with_retry, RetryPolicy};
use crate::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One page of raw source records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    pub records: Vec<Value>,
    /// Cursor for the next page; `None` when the result set is exhausted
    pub next_page_token: Option<String>,
}

/// Source-specific capabilities of a connector
#[async_trait]
pub trait Source: Send + Sync {
    /// Lower-case source name, as used in trigger events
    fn name(&self) -> &str;

    /// Builds the change filter for records updated after `since`
    ///
    /// `since` is `None` when no watermark exists and every record is wanted.
    async fn build_query(&self, since: Option<DateTime<Utc>>) -> Result<String, SyncError>;

    /// Fetches one page of records matching `query`
    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<SourcePage, SyncError>;

    /// Maps one record to an index document
    fn to_document(&self, record: &Value, context: &DocumentContext) -> IndexDocument;
}

/// Index and data source a sync job belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentity {
    pub index_id: String,
    pub data_source_id: String,
}

/// A source bound to one logical sync pass
pub struct Connector {
    source: Box<dyn Source>,
    index: Arc<dyn IndexService>,
    identity: JobIdentity,
    execution_id: Option<String>,
    is_complete: bool,
    watermark: Watermark,
    watermark_buffer: Duration,
    batch_size: usize,
    start_policy: RetryPolicy,
    query: Option<String>,
}

impl Connector {
    pub fn new(
        source: Box<dyn Source>,
        index: Arc<dyn IndexService>,
        identity: JobIdentity,
        watermark: Watermark,
        sync: &SyncConfig,
    ) -> Self {
        Self {
            source,
            index,
            identity,
            execution_id: None,
            is_complete: false,
            watermark,
            watermark_buffer: Duration::from_secs(sync.watermark_buffer_secs),
            batch_size: sync.batch_size.max(1),
            start_policy: RetryPolicy::for_start_sync(sync.start_sync_attempts),
            query: None,
        }
    }

    /// Resumes the sync job opened by an earlier invocation
    pub fn with_execution_id(mut self, execution_id: Option<String>) -> Self {
        self.execution_id = execution_id;
        self
    }

    /// Opens the index-side sync job unless one is already open
    pub async fn start_sync(&mut self) -> Result<(), SyncError> {
        if let Some(execution_id) = &self.execution_id {
            tracing::info!("Continuing sync job {}", execution_id);
            return Ok(());
        }

        tracing::info!(
            "Starting sync job for data source {} on index {}",
            self.identity.data_source_id,
            self.identity.index_id
        );

        let index = &self.index;
        let identity = &self.identity;
        let attempts = AtomicUsize::new(0);
        let execution_id = with_retry(
            &self.start_policy,
            "start sync job",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                index.start_sync_job(&identity.data_source_id, &identity.index_id)
            },
            // A job already running for this data source will not finish on its own
            |e: &StoreError| !matches!(e, StoreError::JobConflict { .. }),
        )
        .await
        .map_err(|source| SyncError::StartSync {
            attempts: attempts.load(Ordering::SeqCst),
            source,
        })?;

        tracing::info!("Sync job execution id: {}", execution_id);
        self.execution_id = Some(execution_id);
        Ok(())
    }

    /// Stops the index-side sync job; a no-op when none was opened
    pub async fn stop_sync(&self) -> Result<(), SyncError> {
        if self.execution_id.is_none() {
            tracing::info!("No active sync job to stop");
            return Ok(());
        }

        tracing::info!(
            "Stopping sync job for data source {}",
            self.identity.data_source_id
        );
        self.index
            .stop_sync_job(&self.identity.data_source_id, &self.identity.index_id)
            .await
            .map_err(SyncError::StopSync)
    }

    /// Fetches one page and maps it to documents
    ///
    /// Marks the pass complete when the page carries no next cursor.
    pub async fn get_documents(
        &mut self,
        page_token: Option<&str>,
    ) -> Result<(Vec<IndexDocument>, Option<String>), SyncError> {
        let query = match &self.query {
            Some(query) => query.clone(),
            None => {
                let since = self.watermark.filter_boundary(self.watermark_buffer);
                let query = self.source.build_query(since).await?;
                tracing::debug!("{} query: {}", self.source.name(), query);
                self.query = Some(query.clone());
                query
            }
        };

        let page = self.source.fetch_page(&query, page_token).await?;
        self.is_complete = page.next_page_token.is_none();

        let context = DocumentContext {
            data_source_id: self.identity.data_source_id.clone(),
            execution_id: self.execution_id.clone().unwrap_or_default(),
        };
        let documents = page
            .records
            .iter()
            .map(|record| self.source.to_document(record, &context))
            .collect();

        Ok((documents, page.next_page_token))
    }

    /// Submits documents in sequential batches
    pub async fn submit_documents(&self, documents: &[IndexDocument]) -> Result<(), SyncError> {
        if documents.is_empty() {
            tracing::info!("No documents to submit");
            return Ok(());
        }

        for batch in documents.chunks(self.batch_size) {
            tracing::debug!("Submitting batch of {} documents", batch.len());
            self.index
                .put_documents(&self.identity.index_id, batch)
                .await
                .map_err(SyncError::Submit)?;
        }
        Ok(())
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn is_sync_done(&self) -> bool {
        self.is_complete
    }

    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }
}
