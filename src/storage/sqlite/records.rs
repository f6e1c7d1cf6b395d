// File: src/storage/sqlite/records.rs

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::convert;
use super::store::SqliteStore;
use crate::error::StorageError;
use crate::traits::{NewRecord, Record};

const RECORD_COLUMNS: &str = "id, category, severity_score, text, storage_ref, created_at";

impl SqliteStore {
    /// Insert a record (submission path and test fixtures)
    pub fn insert_record(&self, record: NewRecord) -> Result<Record, StorageError> {
        let conn = self.get_conn()?;
        let created_at = Utc::now();
        let nanos = created_at.timestamp_nanos_opt().unwrap_or(0);

        conn.execute(
            "INSERT INTO records (category, text, storage_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![record.category, record.text, record.storage_ref, nanos],
        )?;

        Ok(Record {
            id: conn.last_insert_rowid(),
            category: record.category,
            severity_score: None,
            text: record.text,
            storage_ref: record.storage_ref,
            created_at,
        })
    }

    /// Look up a record by id
    pub fn get_record(&self, record_id: i64) -> Result<Option<Record>, StorageError> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
            params![record_id],
            convert::row_to_record,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn fetch_unprocessed_impl(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>, StorageError> {
        let conn = self.get_conn()?;
        let since_nanos = since.and_then(|t| t.timestamp_nanos_opt()).unwrap_or(0);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records
             WHERE created_at > ?1
               AND id NOT IN (SELECT record_id FROM batch_members)
             ORDER BY id ASC",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![since_nanos], convert::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub(crate) fn count_unprocessed_impl(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, StorageError> {
        let conn = self.get_conn()?;
        let since_nanos = since.and_then(|t| t.timestamp_nanos_opt()).unwrap_or(0);

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records
             WHERE created_at > ?1
               AND id NOT IN (SELECT record_id FROM batch_members)",
            params![since_nanos],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    pub(crate) fn update_record_severity_impl(
        &self,
        record_id: i64,
        score: f64,
    ) -> Result<(), StorageError> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE records SET severity_score = ?1 WHERE id = ?2",
            params![score, record_id],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("record {}", record_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(category: &str) -> NewRecord {
        NewRecord {
            category: category.to_string(),
            text: "report body".to_string(),
            storage_ref: String::new(),
        }
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store.insert_record(new_record("a")).unwrap();
        let b = store.insert_record(new_record("b")).unwrap();
        assert!(b.id > a.id);
        assert!(a.severity_score.is_none());
    }

    #[test]
    fn test_fetch_unprocessed_orders_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..5 {
            store.insert_record(new_record(&format!("cat-{}", i))).unwrap();
        }

        let records = store.fetch_unprocessed_impl(None).unwrap();
        assert_eq!(records.len(), 5);
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_update_severity_persists() {
        let store = SqliteStore::in_memory().unwrap();
        let record = store.insert_record(new_record("a")).unwrap();

        store.update_record_severity_impl(record.id, 0.42).unwrap();

        let fetched = store.get_record(record.id).unwrap().unwrap();
        assert_eq!(fetched.severity_score, Some(0.42));
    }

    #[test]
    fn test_update_severity_missing_record() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.update_record_severity_impl(999, 0.5);
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_count_matches_fetch() {
        let store = SqliteStore::in_memory().unwrap();
        for _ in 0..3 {
            store.insert_record(new_record("x")).unwrap();
        }
        assert_eq!(store.count_unprocessed_impl(None).unwrap(), 3);
        assert_eq!(store.fetch_unprocessed_impl(None).unwrap().len(), 3);
    }
}
