//! Trigger and continuation events
//!
//! The continuation event carries the same fields as the trigger, so a
//! re-delivered continuation enters through the same handler path.

use crate::storage::EventEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kind stamped on continuation events
pub const SELF_INVOCATION: &str = "SelfInvocation";

/// Detail of a trigger or continuation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub index_id: String,
    pub data_source_name: String,
    pub data_source_id: String,

    /// Page cursor to resume from; absent at the start of a pass
    #[serde(default)]
    pub next_page_token: Option<String>,

    /// Sync job opened by an earlier invocation of the same pass
    #[serde(default, alias = "kendra_job_execution_id")]
    pub job_execution_id: Option<String>,
}

impl SyncEvent {
    /// Parses either a bare detail object or a bus envelope with a `detail` field
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(into_detail(value)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// The event that resumes this pass at `next_page_token`
    pub fn continuation(
        &self,
        next_page_token: Option<String>,
        job_execution_id: Option<String>,
    ) -> Self {
        Self {
            index_id: self.index_id.clone(),
            data_source_name: self.data_source_name.clone(),
            data_source_id: self.data_source_id.clone(),
            next_page_token,
            job_execution_id,
        }
    }

    /// Wraps this event for the event bus
    pub fn to_entry(&self, source: &str) -> Result<EventEntry, serde_json::Error> {
        Ok(EventEntry {
            source: source.to_string(),
            detail_type: SELF_INVOCATION.to_string(),
            detail: serde_json::to_string(self)?,
        })
    }
}

/// Unwraps the detail of a bus envelope; a bare detail is returned as is
fn into_detail(value: Value) -> Result<Value, serde_json::Error> {
    match value {
        Value::Object(mut map) if map.contains_key("detail") => {
            match map.remove("detail").unwrap_or(Value::Null) {
                // Some buses deliver the detail still JSON-encoded
                Value::String(encoded) => serde_json::from_str(&encoded),
                other => Ok(other),
            }
        }
        other => Ok(other),
    }
}

/// Index and data source ids carried by a raw trigger
///
/// Reads only those two fields, so it still succeeds when the rest of the
/// event does not parse as a [`SyncEvent`].
pub fn trigger_ids(value: &Value) -> Option<(String, String)> {
    let detail = into_detail(value.clone()).ok()?;
    let field = |key: &str| detail.get(key).and_then(Value::as_str).map(str::to_string);
    Some((field("index_id")?, field("data_source_id")?))
}
