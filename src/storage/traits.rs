//! Collaborator traits and error types
//!
//! This module defines the interfaces the sync core calls against. Each trait
//! mirrors the operations of one external service; nothing else about those
//! services is assumed.

use crate::connector::IndexDocument;
use crate::storage::EventEntry;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when calling a collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Parameter already exists: {0}")]
    ParameterExists(String),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("A sync job is already running for data source {data_source_id} on index {index_id}")]
    JobConflict {
        data_source_id: String,
        index_id: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ParameterNotFound(_) | Self::SecretNotFound(_))
    }
}

/// Result type for collaborator calls
pub type StoreResult<T> = Result<T, StoreError>;

/// The search index that owns documents and sync jobs
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Opens a sync job for the data source and returns its execution id
    async fn start_sync_job(&self, data_source_id: &str, index_id: &str) -> StoreResult<String>;

    /// Stops the running sync job for the data source, if any
    async fn stop_sync_job(&self, data_source_id: &str, index_id: &str) -> StoreResult<()>;

    /// Adds or replaces documents by `Id`
    ///
    /// Callers keep each call within the service's batch limit.
    async fn put_documents(&self, index_id: &str, documents: &[IndexDocument]) -> StoreResult<()>;
}

/// Durable parameter store
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the stored value, or [`StoreError::ParameterNotFound`]
    async fn get_parameter(&self, name: &str) -> StoreResult<String>;

    /// Stores a value; fails with [`StoreError::ParameterExists`] when
    /// `overwrite` is false and the parameter is already set
    async fn put_parameter(&self, name: &str, value: &str, overwrite: bool) -> StoreResult<()>;
}

/// Secret store holding source credentials
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the secret's string payload (JSON for source credentials)
    async fn get_secret(&self, name: &str) -> StoreResult<String>;
}

/// Event bus used to schedule the next bounded invocation
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes one event and returns the bus-assigned event id
    async fn put_event(&self, entry: &EventEntry) -> StoreResult<String>;
}
