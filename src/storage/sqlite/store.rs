// File: src/storage/sqlite/store.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::config::SqliteConfig;
use super::schema;
use crate::error::StorageError;
use crate::traits::{
    Batch, BatchMember, CommitResult, LedgerTotals, NewBatch, NewMember, Record, Storage,
};

/// SQLite implementation of the [`Storage`] trait
pub struct SqliteStore {
    /// Database connection (protected by mutex for thread safety)
    conn: Arc<Mutex<Connection>>,

    #[allow(dead_code)]
    config: SqliteConfig,
}

impl SqliteStore {
    /// Create a new store with default configuration
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let config = SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create with custom configuration
    pub fn with_config(config: SqliteConfig) -> Result<Self, StorageError> {
        let conn = Connection::open(&config.path).map_err(|e| {
            StorageError::ConnectionFailed(format!("failed to open db: {}", e))
        })?;

        Self::configure_connection(&conn, &config)?;
        schema::create_tables(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let config = SqliteConfig {
            path: ":memory:".to_string(),
            wal_mode: false,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Configure SQLite connection pragmas
    fn configure_connection(conn: &Connection, config: &SqliteConfig) -> Result<(), StorageError> {
        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms as i64)?;
        if config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", "ON")?;
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    /// Get locked connection for internal operations
    pub(crate) fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::ConnectionFailed("lock poisoned".into()))
    }
}

impl Storage for SqliteStore {
    fn fetch_unprocessed_records(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>, StorageError> {
        self.fetch_unprocessed_impl(since)
    }

    fn count_unprocessed_records(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, StorageError> {
        self.count_unprocessed_impl(since)
    }

    fn latest_batch_timestamp(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.latest_batch_timestamp_impl()
    }

    fn update_record_severity(&self, record_id: i64, score: f64) -> Result<(), StorageError> {
        self.update_record_severity_impl(record_id, score)
    }

    fn next_batch_number(&self) -> Result<u64, StorageError> {
        self.next_batch_number_impl()
    }

    fn commit_batch(
        &self,
        batch: NewBatch,
        members: &[NewMember],
    ) -> Result<CommitResult, StorageError> {
        self.commit_batch_impl(batch, members)
    }

    fn list_batches(&self, limit: u64, offset: u64) -> Result<Vec<Batch>, StorageError> {
        self.list_batches_impl(limit, offset)
    }

    fn get_batch(&self, batch_number: u64) -> Result<Option<Batch>, StorageError> {
        self.get_batch_impl(batch_number)
    }

    fn get_member_records(
        &self,
        batch_id: &Uuid,
    ) -> Result<Vec<(BatchMember, Record)>, StorageError> {
        self.get_member_records_impl(batch_id)
    }

    fn ledger_totals(&self) -> Result<LedgerTotals, StorageError> {
        self.ledger_totals_impl()
    }

    fn category_distribution(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        self.category_distribution_impl()
    }
}
