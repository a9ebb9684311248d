//! Storage module for the collaborators a sync session talks to
//!
//! The orchestrator only depends on the traits in [`traits`]:
//! - [`IndexService`]: sync job lifecycle and batched document submission
//! - [`ParameterStore`]: durable key/value store holding the watermark
//! - [`SecretStore`]: credential lookup
//! - [`EventBus`]: delivery of continuation events
//!
//! Backends:
//! - [`SqliteStorage`]: a local index, parameter store and event outbox in one database
//! - [`FileSecretStore`]: secrets read from a JSON file
//! - [`MemoryStorage`]: in-process implementation of every trait, with failure injection

mod memory;
mod schema;
mod secrets;
mod sqlite;
mod traits;

pub use memory::{MemoryStorage, StoreCall};
pub use secrets::FileSecretStore;
pub use sqlite::SqliteStorage;
pub use traits::{EventBus, IndexService, ParameterStore, SecretStore, StoreError, StoreResult};

use serde::{Deserialize, Serialize};

/// An outbound event as handed to the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Event source name used for routing
    pub source: String,

    /// Event kind, e.g. `SelfInvocation`
    #[serde(rename = "detail-type")]
    pub detail_type: String,

    /// JSON-encoded event payload
    pub detail: String,
}

/// A document as stored by the local index
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub index_id: String,
    pub id: String,
    pub title: String,
    pub blob: String,
    pub content_type: String,
    pub attributes_json: String,
    pub indexed_at: String,
}

/// An index-side sync job
#[derive(Debug, Clone)]
pub struct SyncJobRecord {
    pub execution_id: String,
    pub index_id: String,
    pub data_source_id: String,
    pub status: SyncJobStatus,
    pub started_at: String,
    pub stopped_at: Option<String>,
}

/// Status of an index-side sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJobStatus {
    Running,
    Stopped,
}

impl SyncJobStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}
