//! Record leaf hashing

use sha2::{Digest, Sha256};

use super::Hash;

/// Compute the leaf hash for a record.
///
/// The digest covers the string concatenation of the record id, the external
/// storage reference (empty string when the record has none) and the
/// record's 0-based sequence position in the batch, in that exact order.
/// Any party holding the same three values recomputes the same leaf, which
/// is what makes batch exports independently verifiable.
pub fn leaf_hash(record_id: i64, storage_ref: &str, sequence_id: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(record_id.to_string().as_bytes());
    hasher.update(storage_ref.as_bytes());
    hasher.update(sequence_id.to_string().as_bytes());
    hasher.finalize().into()
}
