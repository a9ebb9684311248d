//! Ticket-Sync: a resumable, time-boxed incremental indexer
//!
//! This crate crawls a ticketing system (Jira Cloud) and submits the changed
//! tickets to a search index. A logical sync pass may span many bounded
//! invocations: each invocation pages through the source until it either runs
//! out of pages or exhausts its time budget, then hands the page cursor and the
//! open sync job id to the next invocation through a continuation event.

pub mod config;
pub mod connector;
pub mod extract;
pub mod session;
pub mod storage;
pub mod transport;

use thiserror::Error;

/// Main error type for sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    #[error("Failed to resolve source timezone: {0}")]
    Timezone(String),

    #[error("Failed to resolve secret {name}: {message}")]
    Secret { name: String, message: String },

    #[error("Error retrieving last crawled timestamp from {name}: {source}")]
    Watermark {
        name: String,
        source: storage::StoreError,
    },

    #[error("Error persisting last crawled timestamp to {name}: {source}")]
    WatermarkWrite {
        name: String,
        source: storage::StoreError,
    },

    #[error("Failed to start sync job after {attempts} attempts: {source}")]
    StartSync {
        attempts: usize,
        source: storage::StoreError,
    },

    #[error("Failed to stop sync job: {0}")]
    StopSync(storage::StoreError),

    #[error("Failed to submit documents: {0}")]
    Submit(storage::StoreError),

    #[error("Error emitting continuation event: {0}")]
    Continuation(storage::StoreError),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: session::SessionState,
        to: session::SessionState,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid data source selected: {0}")]
    UnknownSource(String),

    #[error("Data source {0} is not configured")]
    MissingSource(String),
}

// Re-export commonly used types
pub use config::Config;
pub use connector::{Connector, IndexDocument, Source};
pub use session::{handle, InvocationResponse, SessionState, SyncEvent};
