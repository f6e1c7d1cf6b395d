//! BlockBuilder - the one-batch-per-invocation orchestrator

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate, CategoryStats, TierCounts};
use crate::config::ClassifierConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::merkle::{leaf_hash, Hash, MerkleTree};
use crate::traits::{
    Classifier, MetadataPublisher, NewBatch, NewMember, Record, Storage,
};

use super::classify::classify_missing;

/// Summary returned by a successful batch creation
#[derive(Debug, Clone, Serialize)]
pub struct BatchReceipt {
    pub batch_id: Uuid,
    pub batch_number: u64,
    pub merkle_root: String,
    pub record_count: u64,
    pub top_category: Option<String>,
    pub total_priority_score: f64,
    pub elapsed_ms: u64,
}

/// Stats a create run would persist, without committing anything
#[derive(Debug, Clone, Serialize)]
pub struct PreviewStats {
    pub record_count: u64,
    pub top_category: Option<String>,
    pub total_priority_score: f64,
    pub category_stats: BTreeMap<String, CategoryStats>,
    pub tier_stats: TierCounts,
}

/// Builds one batch per invocation out of the pending record set
///
/// All collaborators are injected; the builder owns no I/O of its own
/// beyond calling them. At most one create run is in flight at a time -
/// concurrent calls serialize on an internal lock, which is what keeps a
/// record from landing in two batches.
pub struct BlockBuilder {
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn Classifier>,
    publisher: Option<Arc<dyn MetadataPublisher>>,
    classifier_config: ClassifierConfig,
    create_lock: Mutex<()>,
}

impl BlockBuilder {
    /// Create a builder from its collaborators
    pub fn new(
        storage: Arc<dyn Storage>,
        classifier: Arc<dyn Classifier>,
        publisher: Option<Arc<dyn MetadataPublisher>>,
        classifier_config: ClassifierConfig,
    ) -> Self {
        Self {
            storage,
            classifier,
            publisher,
            classifier_config,
            create_lock: Mutex::new(()),
        }
    }

    /// Storage handle (shared with the query service)
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Create one batch from all currently unprocessed records.
    ///
    /// Fetches the pending set, fills in missing severity scores,
    /// aggregates, commits the Merkle root plus membership rows in a single
    /// transaction, and best-effort publishes a metadata summary. Nothing
    /// is written unless the whole unit commits; the only prior writes are
    /// the severity scores, which belong to the record rows regardless.
    ///
    /// # Errors
    /// * `LedgerError::NoPendingRecords` - nothing to batch ("nothing to
    ///   do", not a failure)
    /// * `LedgerError::InvalidTree` - post-build validation failed; aborts
    ///   before any batch write
    /// * `LedgerError::Storage` - the commit transaction failed; no batch
    ///   or membership rows remain
    pub async fn create_batch(&self, actor_id: &str) -> LedgerResult<BatchReceipt> {
        let _guard = self.create_lock.lock().await;
        let started = Instant::now();

        let mut records = self.fetch_pending()?;
        classify_missing(
            &self.storage,
            &self.classifier,
            &self.classifier_config,
            &mut records,
        )
        .await?;

        let stats = aggregate(&records);

        let leaves: Vec<Hash> = records
            .iter()
            .enumerate()
            .map(|(i, r)| leaf_hash(r.id, &r.storage_ref, i as u64))
            .collect();
        let tree = MerkleTree::build(&leaves)?;
        if !tree.validate() {
            return Err(LedgerError::InvalidTree(
                "post-build validation failed".into(),
            ));
        }

        let external_metadata_ref = self
            .publish_summary(&records, &stats, &tree)
            .await
            .unwrap_or_default();

        let members: Vec<NewMember> = records
            .iter()
            .zip(&leaves)
            .enumerate()
            .map(|(i, (record, leaf))| NewMember {
                record_id: record.id,
                leaf_hash: *leaf,
                inclusion_order: i as u64,
            })
            .collect();

        let commit = self.storage.commit_batch(
            NewBatch {
                merkle_root: tree.root(),
                record_count: records.len() as u64,
                top_category: stats.top_category.clone(),
                total_priority_score: stats.total_priority_score,
                category_stats: stats.category_stats,
                tier_stats: stats.tier_stats,
                created_by: actor_id.to_string(),
                external_metadata_ref,
            },
            &members,
        )?;

        let elapsed = started.elapsed();
        info!(
            batch_number = commit.batch_number,
            record_count = records.len(),
            top_category = stats.top_category.as_deref().unwrap_or("-"),
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch committed"
        );

        Ok(BatchReceipt {
            batch_id: commit.batch_id,
            batch_number: commit.batch_number,
            merkle_root: hex::encode(tree.root()),
            record_count: records.len() as u64,
            top_category: stats.top_category,
            total_priority_score: stats.total_priority_score,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Inspect what a create run would batch, without committing.
    ///
    /// Runs fetch + classify + aggregate only. Scores filled in here are
    /// persisted (as in a real run), so a following `create_batch` over the
    /// same pending set produces identical stats.
    pub async fn preview_batch(&self) -> LedgerResult<PreviewStats> {
        let mut records = self.fetch_pending()?;
        classify_missing(
            &self.storage,
            &self.classifier,
            &self.classifier_config,
            &mut records,
        )
        .await?;

        let stats = aggregate(&records);
        Ok(PreviewStats {
            record_count: records.len() as u64,
            top_category: stats.top_category,
            total_priority_score: stats.total_priority_score,
            category_stats: stats.category_stats,
            tier_stats: stats.tier_stats,
        })
    }

    /// Number of records a create run would currently include
    pub fn pending_count(&self) -> LedgerResult<u64> {
        let since = self.storage.latest_batch_timestamp()?;
        Ok(self.storage.count_unprocessed_records(since)?)
    }

    /// Step 1: records newer than the latest batch and not yet members
    fn fetch_pending(&self) -> LedgerResult<Vec<Record>> {
        let since = self.storage.latest_batch_timestamp()?;
        let records = self.storage.fetch_unprocessed_records(since)?;

        if records.is_empty() {
            return Err(LedgerError::NoPendingRecords);
        }
        debug!(pending = records.len(), "Fetched unprocessed records");
        Ok(records)
    }

    /// Step 5: best-effort metadata publish; failures are logged and eaten
    async fn publish_summary(
        &self,
        records: &[Record],
        stats: &crate::aggregate::AggregationResult,
        tree: &MerkleTree,
    ) -> Option<String> {
        let publisher = self.publisher.as_ref()?;

        let summary = serde_json::json!({
            "record_count": records.len(),
            "top_category": stats.top_category,
            "total_priority_score": stats.total_priority_score,
            "category_stats": stats.category_stats,
            "tier_stats": stats.tier_stats,
            "tree_depth": tree.depth(),
            "merkle_root": hex::encode(tree.root()),
        });

        match publisher.publish(&summary).await {
            Ok(reference) => {
                debug!(reference = %reference, "Published batch metadata");
                Some(reference)
            }
            Err(e) => {
                warn!(error = %e, "Metadata publish failed, continuing without it");
                None
            }
        }
    }
}
