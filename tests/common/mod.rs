//! Shared fixtures for integration tests

use std::sync::Arc;

use ebl_server::classify::FixedClassifier;
use ebl_server::traits::NewRecord;
use ebl_server::{BlockBuilder, ClassifierConfig, SqliteStore, Storage};

/// Fresh in-memory store
pub fn test_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().expect("Failed to create in-memory storage"))
}

/// Builder over `store` with a classifier pinned to `score`
pub fn test_builder(store: Arc<SqliteStore>, score: f64) -> Arc<BlockBuilder> {
    Arc::new(BlockBuilder::new(
        store as Arc<dyn Storage>,
        Arc::new(FixedClassifier::new(score).expect("score in range")),
        None,
        ClassifierConfig::default(),
    ))
}

/// Insert `n` records in `category`, returning their ids
pub fn seed_records(store: &SqliteStore, category: &str, n: usize) -> Vec<i64> {
    (0..n)
        .map(|i| {
            store
                .insert_record(NewRecord {
                    category: category.to_string(),
                    text: format!("{} report {}", category, i),
                    storage_ref: format!("{}-ref-{}", category, i),
                })
                .expect("Failed to insert record")
                .id
        })
        .collect()
}
