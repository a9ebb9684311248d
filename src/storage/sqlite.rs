//! SQLite storage implementation
//!
//! A single database file stands in for the search index, the parameter store
//! and the event bus when the binary runs locally.

use crate::connector::IndexDocument;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{EventBus, IndexService, ParameterStore, StoreError, StoreResult};
use crate::storage::{DocumentRecord, EventEntry, SyncJobRecord, SyncJobStatus};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    // ===== Index inspection =====

    /// Gets a document by id
    pub fn get_document(&self, index_id: &str, id: &str) -> StoreResult<Option<DocumentRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT index_id, id, title, blob, content_type, attributes_json, indexed_at
                 FROM documents WHERE index_id = ?1 AND id = ?2",
                params![index_id, id],
                |row| {
                    Ok(DocumentRecord {
                        index_id: row.get(0)?,
                        id: row.get(1)?,
                        title: row.get(2)?,
                        blob: row.get(3)?,
                        content_type: row.get(4)?,
                        attributes_json: row.get(5)?,
                        indexed_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Counts the documents stored for an index
    pub fn count_documents(&self, index_id: &str) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE index_id = ?1",
            params![index_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Gets the most recently started job for a data source
    pub fn latest_job(
        &self,
        data_source_id: &str,
        index_id: &str,
    ) -> StoreResult<Option<SyncJobRecord>> {
        let conn = self.conn()?;
        let job = conn
            .query_row(
                "SELECT execution_id, index_id, data_source_id, status, started_at, stopped_at
                 FROM sync_jobs WHERE data_source_id = ?1 AND index_id = ?2
                 ORDER BY rowid DESC LIMIT 1",
                params![data_source_id, index_id],
                |row| {
                    Ok(SyncJobRecord {
                        execution_id: row.get(0)?,
                        index_id: row.get(1)?,
                        data_source_id: row.get(2)?,
                        status: SyncJobStatus::from_db_string(&row.get::<_, String>(3)?)
                            .unwrap_or(SyncJobStatus::Stopped),
                        started_at: row.get(4)?,
                        stopped_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(job)
    }

    // ===== Event outbox =====

    /// Takes the oldest undelivered event and marks it delivered
    pub fn next_pending_event(&self) -> StoreResult<Option<EventEntry>> {
        let conn = self.conn()?;
        let pending = conn
            .query_row(
                "SELECT id, source, detail_type, detail FROM events
                 WHERE delivered_at IS NULL ORDER BY id ASC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        EventEntry {
                            source: row.get(1)?,
                            detail_type: row.get(2)?,
                            detail: row.get(3)?,
                        },
                    ))
                },
            )
            .optional()?;

        match pending {
            Some((id, entry)) => {
                conn.execute(
                    "UPDATE events SET delivered_at = ?1 WHERE id = ?2",
                    params![Utc::now().to_rfc3339(), id],
                )?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Counts undelivered events
    pub fn count_pending_events(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE delivered_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn new_execution_id(conn: &Connection) -> StoreResult<String> {
    let seq: i64 = conn.query_row("SELECT COUNT(*) + 1 FROM sync_jobs", [], |row| row.get(0))?;
    Ok(format!(
        "{}-{:04}",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        seq
    ))
}

#[async_trait]
impl IndexService for SqliteStorage {
    async fn start_sync_job(&self, data_source_id: &str, index_id: &str) -> StoreResult<String> {
        let conn = self.conn()?;

        let running: Option<String> = conn
            .query_row(
                "SELECT execution_id FROM sync_jobs
                 WHERE data_source_id = ?1 AND index_id = ?2 AND status = ?3",
                params![
                    data_source_id,
                    index_id,
                    SyncJobStatus::Running.to_db_string()
                ],
                |row| row.get(0),
            )
            .optional()?;

        if running.is_some() {
            return Err(StoreError::JobConflict {
                data_source_id: data_source_id.to_string(),
                index_id: index_id.to_string(),
            });
        }

        let execution_id = new_execution_id(&conn)?;
        conn.execute(
            "INSERT INTO sync_jobs (execution_id, index_id, data_source_id, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                execution_id,
                index_id,
                data_source_id,
                SyncJobStatus::Running.to_db_string(),
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(execution_id)
    }

    async fn stop_sync_job(&self, data_source_id: &str, index_id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let stopped = conn.execute(
            "UPDATE sync_jobs SET status = ?1, stopped_at = ?2
             WHERE data_source_id = ?3 AND index_id = ?4 AND status = ?5",
            params![
                SyncJobStatus::Stopped.to_db_string(),
                Utc::now().to_rfc3339(),
                data_source_id,
                index_id,
                SyncJobStatus::Running.to_db_string()
            ],
        )?;
        tracing::debug!("Stopped {} running job(s) for {}", stopped, data_source_id);
        Ok(())
    }

    async fn put_documents(&self, index_id: &str, documents: &[IndexDocument]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for doc in documents {
            let attributes_json = serde_json::to_string(&doc.attributes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let content_type = serde_json::to_value(doc.content_type)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            tx.execute(
                "INSERT INTO documents
                    (index_id, id, title, blob, content_type, attributes_json, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(index_id, id) DO UPDATE SET
                    title = excluded.title,
                    blob = excluded.blob,
                    content_type = excluded.content_type,
                    attributes_json = excluded.attributes_json,
                    indexed_at = excluded.indexed_at",
                params![
                    index_id,
                    doc.id,
                    doc.title,
                    doc.blob,
                    content_type.as_str().unwrap_or_default(),
                    attributes_json,
                    now
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for SqliteStorage {
    async fn get_parameter(&self, name: &str) -> StoreResult<String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM parameters WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::ParameterNotFound(name.to_string()))
    }

    async fn put_parameter(&self, name: &str, value: &str, overwrite: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        if overwrite {
            conn.execute(
                "INSERT INTO parameters (name, value, version, updated_at) VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                    value = excluded.value,
                    version = parameters.version + 1,
                    updated_at = excluded.updated_at",
                params![name, value, now],
            )?;
        } else {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO parameters (name, value, version, updated_at)
                 VALUES (?1, ?2, 1, ?3)",
                params![name, value, now],
            )?;
            if inserted == 0 {
                return Err(StoreError::ParameterExists(name.to_string()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventBus for SqliteStorage {
    async fn put_event(&self, entry: &EventEntry) -> StoreResult<String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO events (source, detail_type, detail, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.source,
                entry.detail_type,
                entry.detail,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(format!("event-{}", conn.last_insert_rowid()))
    }
}
