//! In-process classifier implementations
//!
//! The production scorer is an external service behind the
//! [`Classifier`] trait; these stand-ins cover tests, the CLI, and
//! deployments that run without it.

use async_trait::async_trait;

use crate::error::ClassifierError;
use crate::traits::Classifier;

/// Returns the same score for every record
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier {
    score: f64,
}

impl FixedClassifier {
    /// Create a classifier pinned to `score`.
    ///
    /// # Errors
    /// * `ClassifierError::ScoreOutOfRange` - `score` outside [0, 1]
    pub fn new(score: f64) -> Result<Self, ClassifierError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(ClassifierError::ScoreOutOfRange(score));
        }
        Ok(Self { score })
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn score(&self, _text: &str) -> Result<f64, ClassifierError> {
        Ok(self.score)
    }
}

/// Deterministic keyword heuristic
///
/// Starts from a neutral score and subtracts a fixed penalty per distinct
/// severe keyword found in the text, clamping to [0, 1]. Lower = more
/// severe, matching the tier thresholds in [`crate::aggregate`].
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
    penalty: f64,
}

impl KeywordClassifier {
    /// Build from a keyword list; each match lowers the score by `penalty`
    pub fn new(keywords: Vec<String>, penalty: f64) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            penalty,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            ["urgent", "threat", "fraud", "attack", "leak"]
                .into_iter()
                .map(String::from)
                .collect(),
            0.25,
        )
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn score(&self, text: &str) -> Result<f64, ClassifierError> {
        let lowered = text.to_lowercase();
        let hits = self
            .keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .count() as f64;

        Ok((0.8 - hits * self.penalty).clamp(0.0, 1.0))
    }
}
