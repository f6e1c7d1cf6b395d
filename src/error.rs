//! Ledger error types

use thiserror::Error;

/// Main ledger error type
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Batch Errors ==========
    /// No unprocessed records available - nothing to batch
    #[error("no pending records to batch")]
    NoPendingRecords,

    /// Batch not found
    #[error("batch not found: {0}")]
    BatchNotFound(u64),

    /// Record not found
    #[error("record not found: {0}")]
    RecordNotFound(i64),

    /// Record is not a member of the given batch
    #[error("record {record_id} is not a member of batch {batch_number}")]
    MembershipNotFound { batch_number: u64, record_id: i64 },

    // ========== Tree Errors ==========
    /// Merkle tree cannot be built over an empty leaf set
    #[error("cannot build a tree over an empty leaf set")]
    EmptyLeafSet,

    /// Leaf index out of bounds
    #[error("leaf index {index} out of bounds for tree of {leaf_count} leaves")]
    LeafIndexOutOfBounds { index: usize, leaf_count: usize },

    /// Post-build tree validation failed - internal bug, aborts before persistence
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    // ========== Validation Errors ==========
    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid hash format
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    // ========== Collaborator Errors ==========
    /// Severity classifier failure (isolated per record in the create path,
    /// surfaced only when a caller scores directly)
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    // ========== Storage Errors ==========
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(StorageError),

    // ========== Server Errors ==========
    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed - nothing from the failed unit was written
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Data corruption detected
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Storage not initialized
    #[error("storage not initialized")]
    NotInitialized,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),
}

/// Severity classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Classifier did not answer within the configured timeout
    #[error("classifier timed out after {0} ms")]
    Timeout(u64),

    /// Classifier returned a score outside [0, 1]
    #[error("score {0} outside [0, 1]")]
    ScoreOutOfRange(f64),

    /// Classifier call failed
    #[error("classification failed: {0}")]
    Failed(String),
}

/// Metadata publisher errors (always best-effort, never fatal)
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Publish call failed
    #[error("publish failed: {0}")]
    Failed(String),
}

/// Ledger result type alias
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::NoPendingRecords => "NO_PENDING_RECORDS",
            LedgerError::BatchNotFound(_) => "BATCH_NOT_FOUND",
            LedgerError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            LedgerError::MembershipNotFound { .. } => "MEMBERSHIP_NOT_FOUND",
            LedgerError::EmptyLeafSet => "EMPTY_LEAF_SET",
            LedgerError::LeafIndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            LedgerError::InvalidTree(_) => "INVALID_TREE",
            LedgerError::InvalidArgument(_) => "INVALID_ARGUMENT",
            LedgerError::InvalidHash(_) => "INVALID_HASH",
            LedgerError::Classifier(_) => "CLASSIFIER_ERROR",
            LedgerError::Storage(_) => "STORAGE_ERROR",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
            LedgerError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Check if the error is recoverable (caller can retry, or treat as
    /// "nothing to do")
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::NoPendingRecords
                | LedgerError::Classifier(ClassifierError::Timeout(_))
                | LedgerError::Storage(StorageError::ConnectionFailed(_))
        )
    }
}

// Conversions from external errors

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::InvalidArgument(e.to_string())
    }
}

impl From<hex::FromHexError> for LedgerError {
    fn from(e: hex::FromHexError) -> Self {
        LedgerError::InvalidHash(e.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Storage(StorageError::Sqlite(e))
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(msg) => LedgerError::Internal(format!("missing row: {}", msg)),
            other => LedgerError::Storage(other),
        }
    }
}
