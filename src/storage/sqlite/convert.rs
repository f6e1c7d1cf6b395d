// File: src/storage/sqlite/convert.rs

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::error::StorageError;
use crate::merkle::Hash;
use crate::traits::{Batch, BatchMember, Record};

/// Convert stored Unix nanoseconds to a UTC timestamp
pub fn nanos_to_datetime(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// Map a row of `SELECT id, category, severity_score, text, storage_ref,
/// created_at FROM records` to a [`Record`]
pub fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        category: row.get(1)?,
        severity_score: row.get(2)?,
        text: row.get(3)?,
        storage_ref: row.get(4)?,
        created_at: nanos_to_datetime(row.get(5)?),
    })
}

/// Map a full `batches` row (column order as in the schema) to a [`Batch`]
pub fn row_to_batch(row: &Row<'_>) -> rusqlite::Result<Batch> {
    let id: String = row.get(0)?;
    let category_stats: String = row.get(6)?;
    let tier_stats: String = row.get(7)?;

    Ok(Batch {
        id: id.parse::<Uuid>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        batch_number: row.get::<_, i64>(1)? as u64,
        merkle_root: row.get(2)?,
        record_count: row.get::<_, i64>(3)? as u64,
        top_category: row.get(4)?,
        total_priority_score: row.get(5)?,
        category_stats: serde_json::from_str(&category_stats).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?,
        tier_stats: serde_json::from_str(&tier_stats).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_by: row.get(8)?,
        created_at: nanos_to_datetime(row.get(9)?),
        external_metadata_ref: row.get(10)?,
    })
}

/// Convert a stored leaf-hash blob to a fixed-size hash
pub fn blob_to_hash(bytes: Vec<u8>) -> Result<Hash, StorageError> {
    bytes
        .try_into()
        .map_err(|_| StorageError::Corruption("leaf hash is not 32 bytes".into()))
}

/// Assemble a [`BatchMember`] from its row pieces
pub fn member_from_parts(
    batch_id: Uuid,
    record_id: i64,
    leaf_hash: Vec<u8>,
    inclusion_order: i64,
) -> Result<BatchMember, StorageError> {
    Ok(BatchMember {
        batch_id,
        record_id,
        leaf_hash: blob_to_hash(leaf_hash)?,
        inclusion_order: inclusion_order as u64,
    })
}
