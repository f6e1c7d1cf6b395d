// File: src/storage/sqlite/batches.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Transaction};
use uuid::Uuid;

use super::convert;
use super::store::SqliteStore;
use crate::error::StorageError;
use crate::traits::{Batch, BatchMember, CommitResult, LedgerTotals, NewBatch, NewMember, Record};

const BATCH_COLUMNS: &str = "id, batch_number, merkle_root, record_count, top_category, \
     total_priority_score, category_stats, tier_stats, created_by, created_at, \
     external_metadata_ref";

impl SqliteStore {
    pub(crate) fn latest_batch_timestamp_impl(
        &self,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let conn = self.get_conn()?;
        let nanos: Option<i64> =
            conn.query_row("SELECT MAX(created_at) FROM batches", [], |row| row.get(0))?;
        Ok(nanos.map(convert::nanos_to_datetime))
    }

    pub(crate) fn next_batch_number_impl(&self) -> Result<u64, StorageError> {
        let conn = self.get_conn()?;
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(batch_number), 0) + 1 FROM batches",
            [],
            |row| row.get(0),
        )?;
        Ok(next as u64)
    }

    /// Atomically insert the batch row and all membership rows.
    ///
    /// The batch number is read inside the transaction, so history stays
    /// gap-free even if two commits race at the sqlite level. Any failure
    /// rolls the whole unit back.
    pub(crate) fn commit_batch_impl(
        &self,
        batch: NewBatch,
        members: &[NewMember],
    ) -> Result<CommitResult, StorageError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let result = insert_batch_inner(&tx, &batch, members)
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

        tx.commit()
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;
        Ok(result)
    }

    pub(crate) fn list_batches_impl(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Batch>, StorageError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM batches ORDER BY batch_number DESC LIMIT ?1 OFFSET ?2",
            BATCH_COLUMNS
        ))?;

        let batches = stmt
            .query_map(params![limit as i64, offset as i64], convert::row_to_batch)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    pub(crate) fn get_batch_impl(&self, batch_number: u64) -> Result<Option<Batch>, StorageError> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("SELECT {} FROM batches WHERE batch_number = ?1", BATCH_COLUMNS),
            params![batch_number as i64],
            convert::row_to_batch,
        ) {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn get_member_records_impl(
        &self,
        batch_id: &Uuid,
    ) -> Result<Vec<(BatchMember, Record)>, StorageError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT m.record_id, m.leaf_hash, m.inclusion_order,
                    r.id, r.category, r.severity_score, r.text, r.storage_ref, r.created_at
             FROM batch_members m
             JOIN records r ON r.id = m.record_id
             WHERE m.batch_id = ?1
             ORDER BY m.inclusion_order ASC",
        )?;

        let rows = stmt.query_map(params![batch_id.to_string()], |row| {
            let record_id: i64 = row.get(0)?;
            let leaf_hash: Vec<u8> = row.get(1)?;
            let inclusion_order: i64 = row.get(2)?;
            let record = Record {
                id: row.get(3)?,
                category: row.get(4)?,
                severity_score: row.get(5)?,
                text: row.get(6)?,
                storage_ref: row.get(7)?,
                created_at: convert::nanos_to_datetime(row.get(8)?),
            };
            Ok((record_id, leaf_hash, inclusion_order, record))
        })?;

        let mut members = Vec::new();
        for row in rows {
            let (record_id, leaf_hash, inclusion_order, record) = row?;
            let member = convert::member_from_parts(*batch_id, record_id, leaf_hash, inclusion_order)?;
            members.push((member, record));
        }

        Ok(members)
    }

    pub(crate) fn ledger_totals_impl(&self) -> Result<LedgerTotals, StorageError> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(record_count), 0), MAX(batch_number) FROM batches",
            [],
            |row| {
                Ok(LedgerTotals {
                    total_batches: row.get::<_, i64>(0)? as u64,
                    total_records_processed: row.get::<_, i64>(1)? as u64,
                    latest_batch_number: row.get::<_, Option<i64>>(2)?.map(|n| n as u64),
                })
            },
        )
        .map_err(Into::into)
    }

    pub(crate) fn category_distribution_impl(
        &self,
    ) -> Result<BTreeMap<String, u64>, StorageError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.category, COUNT(*)
             FROM batch_members m
             JOIN records r ON r.id = m.record_id
             GROUP BY r.category",
        )?;

        let mut distribution = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        for row in rows {
            let (category, count) = row?;
            distribution.insert(category, count);
        }

        Ok(distribution)
    }
}

fn insert_batch_inner(
    tx: &Transaction,
    batch: &NewBatch,
    members: &[NewMember],
) -> Result<CommitResult, StorageError> {
    let batch_id = Uuid::new_v4();
    let created_at = Utc::now();
    let nanos = created_at.timestamp_nanos_opt().unwrap_or(0);

    let batch_number: i64 = tx.query_row(
        "SELECT COALESCE(MAX(batch_number), 0) + 1 FROM batches",
        [],
        |row| row.get(0),
    )?;

    tx.execute(
        "INSERT INTO batches (id, batch_number, merkle_root, record_count, top_category,
                              total_priority_score, category_stats, tier_stats, created_by,
                              created_at, external_metadata_ref)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            batch_id.to_string(),
            batch_number,
            hex::encode(batch.merkle_root),
            batch.record_count as i64,
            batch.top_category,
            batch.total_priority_score,
            serde_json::to_string(&batch.category_stats)
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
            serde_json::to_string(&batch.tier_stats)
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
            batch.created_by,
            nanos,
            batch.external_metadata_ref,
        ],
    )?;

    for member in members {
        tx.execute(
            "INSERT INTO batch_members (batch_id, record_id, leaf_hash, inclusion_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                batch_id.to_string(),
                member.record_id,
                member.leaf_hash.as_slice(),
                member.inclusion_order as i64,
            ],
        )?;
    }

    Ok(CommitResult {
        batch_id,
        batch_number: batch_number as u64,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TierCounts;
    use crate::merkle::leaf_hash;
    use crate::traits::NewRecord;

    fn seed_records(store: &SqliteStore, n: usize) -> Vec<i64> {
        (0..n)
            .map(|i| {
                store
                    .insert_record(NewRecord {
                        category: "seed".to_string(),
                        text: format!("record {}", i),
                        storage_ref: String::new(),
                    })
                    .unwrap()
                    .id
            })
            .collect()
    }

    fn new_batch(count: u64) -> NewBatch {
        NewBatch {
            merkle_root: [7u8; 32],
            record_count: count,
            top_category: Some("seed".to_string()),
            total_priority_score: count as f64,
            category_stats: BTreeMap::new(),
            tier_stats: TierCounts::default(),
            created_by: "test".to_string(),
            external_metadata_ref: String::new(),
        }
    }

    fn members_for(ids: &[i64]) -> Vec<NewMember> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| NewMember {
                record_id: id,
                leaf_hash: leaf_hash(id, "", i as u64),
                inclusion_order: i as u64,
            })
            .collect()
    }

    #[test]
    fn test_commit_assigns_sequential_numbers() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 4);

        let first = store
            .commit_batch_impl(new_batch(2), &members_for(&ids[..2]))
            .unwrap();
        let second = store
            .commit_batch_impl(new_batch(2), &members_for(&ids[2..]))
            .unwrap();

        assert_eq!(first.batch_number, 1);
        assert_eq!(second.batch_number, 2);
    }

    #[test]
    fn test_commit_rolls_back_on_member_conflict() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 2);

        store
            .commit_batch_impl(new_batch(2), &members_for(&ids))
            .unwrap();

        // Second batch reusing a committed record must fail whole
        let result = store.commit_batch_impl(new_batch(1), &members_for(&ids[..1]));
        assert!(matches!(
            result,
            Err(StorageError::TransactionFailed(_))
        ));

        // No partial batch row survives the rollback
        let totals = store.ledger_totals_impl().unwrap();
        assert_eq!(totals.total_batches, 1);
        assert_eq!(store.next_batch_number_impl().unwrap(), 2);
    }

    #[test]
    fn test_member_records_ordered_by_inclusion() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 3);
        let result = store
            .commit_batch_impl(new_batch(3), &members_for(&ids))
            .unwrap();

        let members = store.get_member_records_impl(&result.batch_id).unwrap();
        assert_eq!(members.len(), 3);
        for (i, (member, record)) in members.iter().enumerate() {
            assert_eq!(member.inclusion_order, i as u64);
            assert_eq!(member.record_id, record.id);
        }
    }

    #[test]
    fn test_committed_records_leave_unprocessed_set() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 3);

        store
            .commit_batch_impl(new_batch(2), &members_for(&ids[..2]))
            .unwrap();

        let pending = store.fetch_unprocessed_impl(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ids[2]);
    }

    #[test]
    fn test_list_batches_descending() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 3);
        for id in &ids {
            store
                .commit_batch_impl(new_batch(1), &members_for(&[*id]))
                .unwrap();
        }

        let batches = store.list_batches_impl(10, 0).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].batch_number, 3);
        assert_eq!(batches[2].batch_number, 1);
    }

    #[test]
    fn test_get_batch_round_trips_stats_json() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 1);

        let mut batch = new_batch(1);
        batch.tier_stats = TierCounts {
            critical: 1,
            high: 0,
            normal: 0,
        };
        store.commit_batch_impl(batch, &members_for(&ids)).unwrap();

        let stored = store.get_batch_impl(1).unwrap().unwrap();
        assert_eq!(stored.tier_stats.critical, 1);
        assert_eq!(stored.merkle_root, hex::encode([7u8; 32]));
        assert!(store.get_batch_impl(99).unwrap().is_none());
    }

    #[test]
    fn test_category_distribution_counts_batched_records() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = seed_records(&store, 2);
        store
            .commit_batch_impl(new_batch(2), &members_for(&ids))
            .unwrap();

        let dist = store.category_distribution_impl().unwrap();
        assert_eq!(dist.get("seed"), Some(&2));
    }
}
