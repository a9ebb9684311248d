//! File-backed secret store

use crate::storage::traits::{SecretStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Reads secrets from a JSON object keyed by secret name
///
/// String values are returned verbatim; any other value is returned as its
/// JSON encoding, so a credential object can be stored inline.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, name: &str) -> StoreResult<String> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let secrets: Value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", self.path.display(), e)))?;

        match secrets.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(StoreError::SecretNotFound(name.to_string())),
            Some(other) => Ok(other.to_string()),
        }
    }
}
