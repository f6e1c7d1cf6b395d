//! ebl-server library exports
//!
//! Batch commitment engine for the Evidence Batch Ledger: classifies
//! pending records, aggregates them by category, and commits each batch
//! under a third-party-verifiable Merkle root.

pub mod aggregate;
pub mod builder;
pub mod classify;
pub mod config;
pub mod error;
pub mod merkle;
pub mod query;
pub mod storage;
pub mod traits;

// Re-exports
pub use builder::{BatchReceipt, BlockBuilder, PreviewStats};
pub use config::{ClassifierConfig, Config};
pub use error::{LedgerError, LedgerResult};
pub use query::BlockQueryService;
pub use storage::SqliteStore;
pub use traits::{Classifier, MetadataPublisher, Storage};
