//! Storage trait definition and persisted domain types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{CategoryStats, TierCounts};
use crate::error::StorageError;
use crate::merkle::Hash;

/// A submitted record awaiting (or past) batching
///
/// Created by the external submission path; the builder only fills in
/// `severity_score` and adds membership rows. Records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, monotonically assigned by storage
    pub id: i64,

    /// Record category (free-form name from the submission path)
    pub category: String,

    /// Normalized severity score in [0, 1]; None until classified
    pub severity_score: Option<f64>,

    /// Free text handed to the severity classifier
    pub text: String,

    /// External storage reference (empty when the record has none)
    pub storage_ref: String,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a record (submission path and tests)
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub category: String,
    pub text: String,
    pub storage_ref: String,
}

/// A committed batch (the "block")
///
/// Immutable after creation - the schema exposes no update or delete for
/// batch rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier (UUID v4)
    pub id: Uuid,

    /// Strictly increasing, gap-free number starting at 1
    pub batch_number: u64,

    /// Hex-encoded SHA-256 Merkle root over the member leaf hashes
    pub merkle_root: String,

    /// Number of membership rows
    pub record_count: u64,

    /// Winning category, None when no record had a determinable category
    pub top_category: Option<String>,

    /// Sum of member priority weights
    pub total_priority_score: f64,

    /// Per-category stats (JSON column at the storage boundary)
    pub category_stats: BTreeMap<String, CategoryStats>,

    /// Batch-wide tier counts (JSON column at the storage boundary)
    pub tier_stats: TierCounts,

    /// Actor that triggered the batch
    pub created_by: String,

    /// When the batch was committed
    pub created_at: DateTime<Utc>,

    /// Reference returned by the metadata publisher (empty if publish
    /// failed or was disabled)
    pub external_metadata_ref: String,
}

/// One record's inclusion in one batch
#[derive(Debug, Clone)]
pub struct BatchMember {
    pub batch_id: Uuid,
    pub record_id: i64,
    pub leaf_hash: Hash,
    /// 0-based position defining leaf ordering in the tree
    pub inclusion_order: u64,
}

/// Batch fields computed by the builder, persisted by `commit_batch`
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub merkle_root: Hash,
    pub record_count: u64,
    pub top_category: Option<String>,
    pub total_priority_score: f64,
    pub category_stats: BTreeMap<String, CategoryStats>,
    pub tier_stats: TierCounts,
    pub created_by: String,
    pub external_metadata_ref: String,
}

/// Membership row to insert alongside a new batch
#[derive(Debug, Clone)]
pub struct NewMember {
    pub record_id: i64,
    pub leaf_hash: Hash,
    pub inclusion_order: u64,
}

/// Identity of a freshly committed batch
#[derive(Debug, Clone, Copy)]
pub struct CommitResult {
    pub batch_id: Uuid,
    pub batch_number: u64,
    pub created_at: DateTime<Utc>,
}

/// Whole-ledger counters for the statistics read path
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LedgerTotals {
    pub total_batches: u64,
    pub total_records_processed: u64,
    pub latest_batch_number: Option<u64>,
}

/// Persistence backend for records, batches and memberships
///
/// Synchronous by design: the reference backend is SQLite behind a mutex,
/// and every write the builder performs is a single short transaction.
pub trait Storage: Send + Sync + 'static {
    /// Fetch records created after `since` that are not yet members of any
    /// batch, ordered ascending by id. `None` means "since the epoch".
    fn fetch_unprocessed_records(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>, StorageError>;

    /// Count-only variant of [`Self::fetch_unprocessed_records`]
    fn count_unprocessed_records(&self, since: Option<DateTime<Utc>>)
        -> Result<u64, StorageError>;

    /// Creation time of the most recent batch, None when no batch exists
    fn latest_batch_timestamp(&self) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Persist a classifier score onto a record row
    fn update_record_severity(&self, record_id: i64, score: f64) -> Result<(), StorageError>;

    /// The number the next committed batch will receive (1 when empty)
    fn next_batch_number(&self) -> Result<u64, StorageError>;

    /// Atomically insert a batch row plus one membership row per member.
    ///
    /// The batch number is assigned inside the transaction, so concurrent
    /// history stays gap-free. Either everything commits or nothing does.
    ///
    /// # Errors
    /// * `StorageError::TransactionFailed` - any insert failed; no rows remain
    fn commit_batch(
        &self,
        batch: NewBatch,
        members: &[NewMember],
    ) -> Result<CommitResult, StorageError>;

    /// List batches ordered by batch number descending
    fn list_batches(&self, limit: u64, offset: u64) -> Result<Vec<Batch>, StorageError>;

    /// Look up a batch by number
    fn get_batch(&self, batch_number: u64) -> Result<Option<Batch>, StorageError>;

    /// Members of a batch with their record rows, ordered by inclusion order
    fn get_member_records(
        &self,
        batch_id: &Uuid,
    ) -> Result<Vec<(BatchMember, Record)>, StorageError>;

    /// Whole-ledger counters
    fn ledger_totals(&self) -> Result<LedgerTotals, StorageError>;

    /// Count of batched records per category, across all batches
    fn category_distribution(&self) -> Result<BTreeMap<String, u64>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: trait is object-safe
    fn _assert_object_safe(_: &dyn Storage) {}

    #[test]
    fn test_batch_serialization_round_trip() {
        let batch = Batch {
            id: Uuid::new_v4(),
            batch_number: 4,
            merkle_root: "ab".repeat(32),
            record_count: 2,
            top_category: Some("fraud".into()),
            total_priority_score: 5.0,
            category_stats: BTreeMap::new(),
            tier_stats: TierCounts::default(),
            created_by: "operator".into(),
            created_at: Utc::now(),
            external_metadata_ref: String::new(),
        };

        let json = serde_json::to_string(&batch).unwrap();
        let back: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_number, 4);
        assert_eq!(back.merkle_root, batch.merkle_root);
        assert_eq!(back.top_category.as_deref(), Some("fraud"));
    }

    #[test]
    fn test_ledger_totals_default() {
        let totals = LedgerTotals::default();
        assert_eq!(totals.total_batches, 0);
        assert!(totals.latest_batch_number.is_none());
    }
}
