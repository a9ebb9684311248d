//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the local collaborator database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Durable parameters (watermarks)
CREATE TABLE IF NOT EXISTS parameters (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

-- Index-side sync jobs
CREATE TABLE IF NOT EXISTS sync_jobs (
    execution_id TEXT PRIMARY KEY,
    index_id TEXT NOT NULL,
    data_source_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    stopped_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sync_jobs_source ON sync_jobs(index_id, data_source_id, status);

-- Indexed documents, replaced by id
CREATE TABLE IF NOT EXISTS documents (
    index_id TEXT NOT NULL,
    id TEXT NOT NULL,
    title TEXT NOT NULL,
    blob TEXT NOT NULL,
    content_type TEXT NOT NULL,
    attributes_json TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    PRIMARY KEY (index_id, id)
);

-- Continuation event outbox, delivered in insertion order
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    detail_type TEXT NOT NULL,
    detail TEXT NOT NULL,
    created_at TEXT NOT NULL,
    delivered_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_pending ON events(delivered_at, id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
