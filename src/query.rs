//! Read path: batch listings, detail with proofs, statistics, audit export

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::builder::BlockBuilder;
use crate::error::{LedgerError, LedgerResult, StorageError};
use crate::merkle::{Hash, MerkleTree};
use crate::traits::{Batch, Record, Storage};

/// One member of a batch, with its inclusion proof
#[derive(Debug, Clone, Serialize)]
pub struct MemberDetail {
    pub record: Record,
    pub leaf_hash: String,
    pub inclusion_order: u64,
    /// Sibling path, bottom-up, hex-encoded
    pub proof: Vec<String>,
}

/// Batch metadata plus its ordered member set
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetail {
    pub batch: Batch,
    pub members: Vec<MemberDetail>,
}

/// Aggregate ledger statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub total_batches: u64,
    pub total_records_processed: u64,
    pub avg_records_per_batch: f64,
    pub latest_batch_number: Option<u64>,
    pub category_distribution: BTreeMap<String, u64>,
    pub recent_activity: Vec<ActivityEntry>,
    pub pending_count: u64,
}

/// One line of recent batch activity
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub batch_number: u64,
    pub record_count: u64,
    pub top_category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Self-contained audit document for independent root recomputation
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub export_id: Uuid,
    pub exported_by: String,
    pub exported_at: DateTime<Utc>,
    pub batch: Batch,
    pub members: Vec<ExportMember>,
}

/// The tuple an auditor needs to recompute one leaf
#[derive(Debug, Clone, Serialize)]
pub struct ExportMember {
    pub record_id: i64,
    pub storage_ref: String,
    pub inclusion_order: u64,
    pub leaf_hash: String,
}

/// Read-only service over persisted batch metadata
pub struct BlockQueryService {
    storage: Arc<dyn Storage>,
    builder: Arc<BlockBuilder>,
}

impl BlockQueryService {
    pub fn new(builder: Arc<BlockBuilder>) -> Self {
        Self {
            storage: builder.storage(),
            builder,
        }
    }

    /// Batches ordered by batch number descending
    pub fn list_batches(&self, limit: u64, offset: u64) -> LedgerResult<Vec<Batch>> {
        Ok(self.storage.list_batches(limit, offset)?)
    }

    /// Batch metadata with member records and per-member inclusion proofs.
    ///
    /// The tree is rebuilt from the stored leaf hashes; a root that no
    /// longer matches the stored root surfaces as a corruption error.
    ///
    /// # Errors
    /// * `LedgerError::BatchNotFound` - no batch with that number
    pub fn get_batch_detail(&self, batch_number: u64) -> LedgerResult<BatchDetail> {
        let (batch, members, tree) = self.load_verified_batch(batch_number)?;

        let details = members
            .into_iter()
            .map(|(member, record)| {
                let proof = tree.proof(member.inclusion_order as usize)?;
                Ok(MemberDetail {
                    record,
                    leaf_hash: hex::encode(member.leaf_hash),
                    inclusion_order: member.inclusion_order,
                    proof: proof.iter().map(hex::encode).collect(),
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(BatchDetail {
            batch,
            members: details,
        })
    }

    /// Whole-ledger statistics; `pending_count` comes from the builder's
    /// count-only preview, not a duplicated query
    pub fn get_statistics(&self) -> LedgerResult<StatsSummary> {
        let totals = self.storage.ledger_totals()?;
        let category_distribution = self.storage.category_distribution()?;
        let recent = self.storage.list_batches(5, 0)?;
        let pending_count = self.builder.pending_count()?;

        let avg_records_per_batch = if totals.total_batches == 0 {
            0.0
        } else {
            totals.total_records_processed as f64 / totals.total_batches as f64
        };

        Ok(StatsSummary {
            total_batches: totals.total_batches,
            total_records_processed: totals.total_records_processed,
            avg_records_per_batch,
            latest_batch_number: totals.latest_batch_number,
            category_distribution,
            recent_activity: recent
                .into_iter()
                .map(|b| ActivityEntry {
                    batch_number: b.batch_number,
                    record_count: b.record_count,
                    top_category: b.top_category,
                    created_at: b.created_at,
                })
                .collect(),
            pending_count,
        })
    }

    /// Export a batch for an external auditor.
    ///
    /// The document carries, per member, exactly the tuple needed to
    /// recompute its leaf hash and from there the Merkle root.
    pub fn export_batch(&self, batch_number: u64, exported_by: &str) -> LedgerResult<ExportDocument> {
        let (batch, members, _tree) = self.load_verified_batch(batch_number)?;

        Ok(ExportDocument {
            export_id: Uuid::new_v4(),
            exported_by: exported_by.to_string(),
            exported_at: Utc::now(),
            batch,
            members: members
                .into_iter()
                .map(|(member, record)| ExportMember {
                    record_id: member.record_id,
                    storage_ref: record.storage_ref,
                    inclusion_order: member.inclusion_order,
                    leaf_hash: hex::encode(member.leaf_hash),
                })
                .collect(),
        })
    }

    /// Generate the inclusion proof for one record of a batch
    pub fn membership_proof(&self, batch_number: u64, record_id: i64) -> LedgerResult<Vec<Hash>> {
        let (_batch, members, tree) = self.load_verified_batch(batch_number)?;
        let member = members
            .iter()
            .find(|(m, _)| m.record_id == record_id)
            .ok_or(LedgerError::MembershipNotFound {
                batch_number,
                record_id,
            })?;

        tree.proof(member.0.inclusion_order as usize)
    }

    /// Verify a caller-supplied inclusion proof for a record of a batch
    pub fn verify_membership(
        &self,
        batch_number: u64,
        record_id: i64,
        proof: &[Hash],
    ) -> LedgerResult<bool> {
        let batch = self.require_batch(batch_number)?;
        let members = self.storage.get_member_records(&batch.id)?;
        let member = members
            .iter()
            .find(|(m, _)| m.record_id == record_id)
            .ok_or(LedgerError::MembershipNotFound {
                batch_number,
                record_id,
            })?;

        let root = decode_root(&batch.merkle_root)?;
        Ok(MerkleTree::verify_proof(
            proof,
            &root,
            &member.0.leaf_hash,
            member.0.inclusion_order as usize,
        ))
    }

    fn require_batch(&self, batch_number: u64) -> LedgerResult<Batch> {
        self.storage
            .get_batch(batch_number)?
            .ok_or(LedgerError::BatchNotFound(batch_number))
    }

    /// Load a batch, its members, and the rebuilt tree, cross-checking the
    /// recomputed root against the stored one
    fn load_verified_batch(
        &self,
        batch_number: u64,
    ) -> LedgerResult<(Batch, Vec<(crate::traits::BatchMember, Record)>, MerkleTree)> {
        let batch = self.require_batch(batch_number)?;
        let members = self.storage.get_member_records(&batch.id)?;

        if members.len() as u64 != batch.record_count {
            return Err(LedgerError::Storage(StorageError::Corruption(format!(
                "batch {} has {} members, expected {}",
                batch_number,
                members.len(),
                batch.record_count
            ))));
        }

        let leaves: Vec<Hash> = members.iter().map(|(m, _)| m.leaf_hash).collect();
        let tree = MerkleTree::build(&leaves)?;

        let stored_root = decode_root(&batch.merkle_root)?;
        if tree.root() != stored_root {
            return Err(LedgerError::Storage(StorageError::Corruption(format!(
                "recomputed root for batch {} does not match stored root",
                batch_number
            ))));
        }

        Ok((batch, members, tree))
    }
}

fn decode_root(hex_root: &str) -> LedgerResult<Hash> {
    let bytes = hex::decode(hex_root)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidHash("root is not 32 bytes".into()))
}
