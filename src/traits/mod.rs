//! Collaborator interfaces and shared domain types
//!
//! Every external dependency of the block builder sits behind a trait in
//! this module, injected through [`crate::builder::BlockBuilder::new`].

pub mod classifier;
pub mod publisher;
pub mod storage;

pub use classifier::Classifier;
pub use publisher::MetadataPublisher;
pub use storage::{
    Batch, BatchMember, CommitResult, LedgerTotals, NewBatch, NewMember, NewRecord, Record,
    Storage,
};
