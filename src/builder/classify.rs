//! Classification pass: fill missing severity scores

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, LedgerResult};
use crate::traits::{Classifier, Record, Storage};

/// Fill in missing severity scores and persist them.
///
/// Classifier calls for independent records run concurrently, each under
/// the configured timeout. A failed or out-of-range call degrades to the
/// neutral fallback score instead of aborting the batch - the signal is
/// advisory. Every score is persisted onto its record row before this
/// returns, so repeated runs never reclassify.
pub(super) async fn classify_missing(
    storage: &Arc<dyn Storage>,
    classifier: &Arc<dyn Classifier>,
    config: &ClassifierConfig,
    records: &mut [Record],
) -> LedgerResult<()> {
    let missing: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.severity_score.is_none())
        .map(|(i, _)| i)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    debug!(unclassified = missing.len(), "Classifying records");

    let calls = missing.iter().map(|&i| {
        let classifier = Arc::clone(classifier);
        let text = records[i].text.clone();
        let record_id = records[i].id;
        let config = *config;
        async move {
            score_with_fallback(classifier.as_ref(), &text, record_id, &config).await
        }
    });
    let scores = join_all(calls).await;

    for (&i, score) in missing.iter().zip(scores) {
        storage.update_record_severity(records[i].id, score)?;
        records[i].severity_score = Some(score);
    }

    Ok(())
}

/// Score one record, degrading to the fallback on any failure
async fn score_with_fallback(
    classifier: &dyn Classifier,
    text: &str,
    record_id: i64,
    config: &ClassifierConfig,
) -> f64 {
    let timeout = Duration::from_millis(config.timeout_ms);

    let failure = match tokio::time::timeout(timeout, classifier.score(text)).await {
        Ok(Ok(score)) if (0.0..=1.0).contains(&score) => return score,
        Ok(Ok(score)) => ClassifierError::ScoreOutOfRange(score),
        Ok(Err(e)) => e,
        Err(_) => ClassifierError::Timeout(config.timeout_ms),
    };

    warn!(
        record_id,
        error = %failure,
        fallback = config.fallback_score,
        "Classifier failed, using fallback score"
    );
    config.fallback_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn score(&self, _text: &str) -> Result<f64, ClassifierError> {
            Err(ClassifierError::Failed("backend down".into()))
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl Classifier for SlowClassifier {
        async fn score(&self, _text: &str) -> Result<f64, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(0.1)
        }
    }

    struct OutOfRangeClassifier;

    #[async_trait]
    impl Classifier for OutOfRangeClassifier {
        async fn score(&self, _text: &str) -> Result<f64, ClassifierError> {
            Ok(3.2)
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            timeout_ms: 50,
            fallback_score: 0.5,
        }
    }

    #[tokio::test]
    async fn test_failure_degrades_to_fallback() {
        let score = score_with_fallback(&FailingClassifier, "text", 1, &config()).await;
        assert_eq!(score, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_to_fallback() {
        let score = score_with_fallback(&SlowClassifier, "text", 1, &config()).await;
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_out_of_range_degrades_to_fallback() {
        let score = score_with_fallback(&OutOfRangeClassifier, "text", 1, &config()).await;
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_valid_score_passes_through() {
        let fixed = crate::classify::FixedClassifier::new(0.9).unwrap();
        let score = score_with_fallback(&fixed, "text", 1, &config()).await;
        assert_eq!(score, 0.9);
    }
}
