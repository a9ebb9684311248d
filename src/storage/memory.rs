//! In-process collaborators
//!
//! `MemoryStorage` implements every collaborator trait over plain maps and
//! records each call it receives, so tests can assert on the exact sequence a
//! session produced. Failures can be injected per operation.

use crate::connector::IndexDocument;
use crate::storage::traits::{
    EventBus, IndexService, ParameterStore, SecretStore, StoreError, StoreResult,
};
use crate::storage::EventEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    StartSync { data_source_id: String },
    StopSync { data_source_id: String },
    PutDocuments { count: usize },
    GetParameter { name: String },
    PutParameter { name: String, value: String },
    GetSecret { name: String },
    PutEvent { source: String },
}

#[derive(Default)]
struct Inner {
    calls: Vec<StoreCall>,
    parameters: HashMap<String, String>,
    secrets: HashMap<String, String>,
    documents: Vec<(String, IndexDocument)>,
    events: Vec<EventEntry>,
    job_counter: usize,
    start_failures: usize,
    start_conflict: bool,
    fail_stop_sync: bool,
    fail_put_documents: bool,
    fail_put_parameter: bool,
    fail_put_event: bool,
    fail_get_parameter: Option<String>,
}

/// In-memory implementation of all collaborator traits
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory storage lock poisoned".to_string()))
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    // ===== Seeding and failure injection =====

    pub fn with_parameter(self, name: &str, value: &str) -> Self {
        self.with(|inner| {
            inner
                .parameters
                .insert(name.to_string(), value.to_string())
        });
        self
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.with(|inner| inner.secrets.insert(name.to_string(), value.to_string()));
        self
    }

    /// Makes the next `times` calls to `start_sync_job` fail
    pub fn fail_start_sync(&self, times: usize) {
        self.with(|inner| inner.start_failures = times);
    }

    /// Makes every `start_sync_job` call report a job already running
    pub fn conflict_on_start(&self) {
        self.with(|inner| inner.start_conflict = true);
    }

    pub fn fail_stop_sync(&self) {
        self.with(|inner| inner.fail_stop_sync = true);
    }

    pub fn fail_put_documents(&self) {
        self.with(|inner| inner.fail_put_documents = true);
    }

    pub fn fail_put_parameter(&self) {
        self.with(|inner| inner.fail_put_parameter = true);
    }

    pub fn fail_put_event(&self) {
        self.with(|inner| inner.fail_put_event = true);
    }

    /// Makes `get_parameter` fail with a backend error carrying `message`
    pub fn fail_get_parameter(&self, message: &str) {
        self.with(|inner| inner.fail_get_parameter = Some(message.to_string()));
    }

    // ===== Inspection =====

    pub fn calls(&self) -> Vec<StoreCall> {
        self.with(|inner| inner.calls.clone())
    }

    pub fn documents(&self) -> Vec<IndexDocument> {
        self.with(|inner| inner.documents.iter().map(|(_, d)| d.clone()).collect())
    }

    pub fn events(&self) -> Vec<EventEntry> {
        self.with(|inner| inner.events.clone())
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.with(|inner| inner.parameters.get(name).cloned())
    }

    pub fn count_calls(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.with(|inner| inner.calls.iter().filter(|c| pred(c)).count())
    }

    pub fn stop_count(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::StopSync { .. }))
    }

    pub fn start_count(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::StartSync { .. }))
    }

    /// Sizes of every `put_documents` call, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.with(|inner| {
            inner
                .calls
                .iter()
                .filter_map(|c| match c {
                    StoreCall::PutDocuments { count } => Some(*count),
                    _ => None,
                })
                .collect()
        })
    }
}

#[async_trait]
impl IndexService for MemoryStorage {
    async fn start_sync_job(&self, data_source_id: &str, index_id: &str) -> StoreResult<String> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::StartSync {
            data_source_id: data_source_id.to_string(),
        });
        if inner.start_conflict {
            return Err(StoreError::JobConflict {
                data_source_id: data_source_id.to_string(),
                index_id: index_id.to_string(),
            });
        }
        if inner.start_failures > 0 {
            inner.start_failures -= 1;
            return Err(StoreError::Backend("sync job start rejected".to_string()));
        }
        inner.job_counter += 1;
        Ok(format!("exec-{}", inner.job_counter))
    }

    async fn stop_sync_job(&self, data_source_id: &str, _index_id: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::StopSync {
            data_source_id: data_source_id.to_string(),
        });
        if inner.fail_stop_sync {
            return Err(StoreError::Backend("sync job stop rejected".to_string()));
        }
        Ok(())
    }

    async fn put_documents(&self, index_id: &str, documents: &[IndexDocument]) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::PutDocuments {
            count: documents.len(),
        });
        if inner.fail_put_documents {
            return Err(StoreError::Backend("batch rejected".to_string()));
        }
        for doc in documents {
            inner.documents.retain(|(idx, d)| !(idx == index_id && d.id == doc.id));
            inner.documents.push((index_id.to_string(), doc.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for MemoryStorage {
    async fn get_parameter(&self, name: &str) -> StoreResult<String> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::GetParameter {
            name: name.to_string(),
        });
        if let Some(message) = &inner.fail_get_parameter {
            return Err(StoreError::Backend(message.clone()));
        }
        inner
            .parameters
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ParameterNotFound(name.to_string()))
    }

    async fn put_parameter(&self, name: &str, value: &str, overwrite: bool) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::PutParameter {
            name: name.to_string(),
            value: value.to_string(),
        });
        if inner.fail_put_parameter {
            return Err(StoreError::Backend("parameter write rejected".to_string()));
        }
        if !overwrite && inner.parameters.contains_key(name) {
            return Err(StoreError::ParameterExists(name.to_string()));
        }
        inner
            .parameters
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemoryStorage {
    async fn get_secret(&self, name: &str) -> StoreResult<String> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::GetSecret {
            name: name.to_string(),
        });
        inner
            .secrets
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::SecretNotFound(name.to_string()))
    }
}

#[async_trait]
impl EventBus for MemoryStorage {
    async fn put_event(&self, entry: &EventEntry) -> StoreResult<String> {
        let mut inner = self.lock()?;
        inner.calls.push(StoreCall::PutEvent {
            source: entry.source.clone(),
        });
        if inner.fail_put_event {
            return Err(StoreError::Backend("event rejected".to_string()));
        }
        inner.events.push(entry.clone());
        Ok(format!("event-{}", inner.events.len()))
    }
}
