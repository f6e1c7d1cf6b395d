// File: src/storage/sqlite/schema.rs

use crate::error::StorageError;
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Create all tables (idempotent)
pub fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA_SQL)?;

    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    conn.execute(
        "INSERT OR IGNORE INTO ebl_config (key, value, updated_at) VALUES ('schema_version', ?1, ?2)",
        rusqlite::params![SCHEMA_VERSION.to_string(), now],
    )?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Core configuration
CREATE TABLE IF NOT EXISTS ebl_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Submitted records awaiting (or past) batching
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,   -- Monotonic record id
    category TEXT NOT NULL,
    severity_score REAL,                    -- NULL until classified
    text TEXT NOT NULL,                     -- Input to the severity classifier
    storage_ref TEXT NOT NULL DEFAULT '',   -- External storage reference
    created_at INTEGER NOT NULL             -- Unix nanoseconds
);

-- Committed batches - append-only, no UPDATE or DELETE path exists
CREATE TABLE IF NOT EXISTS batches (
    id TEXT PRIMARY KEY,                    -- UUID as text
    batch_number INTEGER NOT NULL UNIQUE,   -- Gap-free, starts at 1
    merkle_root TEXT NOT NULL,              -- Hex-encoded SHA-256 root
    record_count INTEGER NOT NULL,
    top_category TEXT,                      -- NULL when undeterminable
    total_priority_score REAL NOT NULL,
    category_stats TEXT NOT NULL,           -- JSON map
    tier_stats TEXT NOT NULL,               -- JSON map
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,            -- Unix nanoseconds
    external_metadata_ref TEXT NOT NULL DEFAULT ''
);

-- One row per record per batch
CREATE TABLE IF NOT EXISTS batch_members (
    batch_id TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    leaf_hash BLOB NOT NULL,                -- 32 bytes
    inclusion_order INTEGER NOT NULL,       -- 0-based leaf position
    PRIMARY KEY (batch_id, record_id),
    UNIQUE (batch_id, inclusion_order),
    FOREIGN KEY (batch_id) REFERENCES batches(id),
    FOREIGN KEY (record_id) REFERENCES records(id)
);

-- Membership is exclusive: a record belongs to at most one batch, ever
CREATE UNIQUE INDEX IF NOT EXISTS idx_members_record ON batch_members(record_id);

-- Indices for common queries
CREATE INDEX IF NOT EXISTS idx_records_created ON records(created_at);
CREATE INDEX IF NOT EXISTS idx_batches_number ON batches(batch_number);
CREATE INDEX IF NOT EXISTS idx_members_batch ON batch_members(batch_id, inclusion_order);
"#;
