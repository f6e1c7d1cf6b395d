//! Severity classifier trait

use async_trait::async_trait;

use crate::error::ClassifierError;

/// External severity scorer
///
/// Given record text, returns a normalized severity score in [0, 1] where
/// lower means more severe. The builder calls this once per unclassified
/// record, persists the result, and never calls it again for that record.
/// Failures are advisory: the create path falls back to a neutral score
/// instead of aborting the batch.
#[async_trait]
pub trait Classifier: Send + Sync + 'static {
    /// Score a record's text.
    ///
    /// # Errors
    /// * `ClassifierError::Failed` - the scoring backend errored
    /// * `ClassifierError::ScoreOutOfRange` - backend returned a score
    ///   outside [0, 1]
    async fn score(&self, text: &str) -> Result<f64, ClassifierError>;
}
