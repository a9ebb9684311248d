//! Index document model
//!
//! Documents are built fresh for every fetched page, submitted in batches and
//! then dropped; the index owns them afterwards. Serialized field names follow
//! the index API (`Id`, `Blob`, `Attributes`, ...).

use serde::{Deserialize, Serialize};

/// Attribute key carrying the data source id
pub const ATTR_DATA_SOURCE_ID: &str = "_data_source_id";

/// Attribute key carrying the sync job execution id
pub const ATTR_SYNC_JOB_EXECUTION_ID: &str = "_data_source_sync_job_execution_id";

/// Attribute key carrying the canonical source URL
pub const ATTR_SOURCE_URI: &str = "_source_uri";

/// Attribute key carrying the last-modified timestamp
pub const ATTR_LAST_UPDATED_AT: &str = "_last_updated_at";

/// Encoding of a document blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "PLAIN_TEXT")]
    PlainText,
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    StringValue(String),
    DateValue(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::StringValue(s) | Self::DateValue(s) => s,
        }
    }
}

/// One key/value attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttribute {
    pub key: String,
    pub value: AttributeValue,
}

impl DocumentAttribute {
    pub fn string(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: AttributeValue::StringValue(value.into()),
        }
    }

    pub fn date(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: AttributeValue::DateValue(value.into()),
        }
    }
}

/// A document submitted to the search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDocument {
    /// Stable identity derived from source identifiers
    pub id: String,
    pub blob: String,
    pub title: String,
    pub content_type: ContentType,
    /// Ordered provenance attributes
    pub attributes: Vec<DocumentAttribute>,
}

impl IndexDocument {
    /// Looks up an attribute by key
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| &a.value)
    }

    /// True when all four provenance attributes are present
    pub fn has_provenance(&self) -> bool {
        [
            ATTR_DATA_SOURCE_ID,
            ATTR_SYNC_JOB_EXECUTION_ID,
            ATTR_SOURCE_URI,
            ATTR_LAST_UPDATED_AT,
        ]
        .iter()
        .all(|key| self.attribute(key).is_some())
    }
}

/// Identity of the sync job a document is produced for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    pub data_source_id: String,
    pub execution_id: String,
}
