//! Server configuration

/// Builder/server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    /// Actor recorded as `created_by` on batches created by this process
    pub actor_id: String,
    /// Classifier call policy
    pub classifier: ClassifierConfig,
    /// Whether to attempt the best-effort metadata publish
    pub publish_metadata: bool,
}

/// Classifier call policy
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Timeout per classifier call in milliseconds
    pub timeout_ms: u64,
    /// Neutral score used when a call fails or times out
    pub fallback_score: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            fallback_score: 0.5,
        }
    }
}

impl ClassifierConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let timeout_ms = std::env::var("EBL_CLASSIFIER_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);

        let fallback_score = std::env::var("EBL_CLASSIFIER_FALLBACK_SCORE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|s| (0.0..=1.0).contains(s))
            .unwrap_or(0.5);

        Self {
            timeout_ms,
            fallback_score,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./ebl.db".to_string(),
            log_level: "info".to_string(),
            actor_id: "system".to_string(),
            classifier: ClassifierConfig::default(),
            publish_metadata: true,
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let database_path =
            std::env::var("EBL_DATABASE_PATH").unwrap_or_else(|_| "./ebl.db".to_string());
        let log_level = std::env::var("EBL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let actor_id = std::env::var("EBL_ACTOR_ID").unwrap_or_else(|_| "system".to_string());
        let publish_metadata = std::env::var("EBL_PUBLISH_METADATA")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        Self {
            database_path,
            log_level,
            actor_id,
            classifier: ClassifierConfig::from_env(),
            publish_metadata,
        }
    }
}
