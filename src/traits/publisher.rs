//! Metadata publisher trait

use async_trait::async_trait;

use crate::error::PublisherError;

/// Best-effort external metadata sink (e.g. distributed file storage)
///
/// The builder pushes a batch summary here before committing. A failure is
/// logged and swallowed - the batch is valid without the published copy,
/// and its `external_metadata_ref` stays empty.
#[async_trait]
pub trait MetadataPublisher: Send + Sync + 'static {
    /// Publish a summary document and return its external reference
    async fn publish(&self, summary: &serde_json::Value) -> Result<String, PublisherError>;
}
