// File: src/storage/sqlite/config.rs

/// SQLite connection configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path (":memory:" for tests)
    pub path: String,

    /// Enable WAL journal mode
    pub wal_mode: bool,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,

    /// Enforce foreign keys
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "./ebl.db".to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SqliteConfig::default();
        assert_eq!(config.path, "./ebl.db");
        assert!(config.wal_mode);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.foreign_keys);
    }
}
