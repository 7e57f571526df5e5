//! Configuration module for the ingestion worker.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{FeedbarError, Result};

/// Longest accepted retention window, in days.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedbar.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedbar.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Ingestion engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Items published before `now - retention_days` are dropped and pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Maximum number of feeds processed per scheduler invocation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Total per-feed fetch timeout in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Interval between scheduler invocations in seconds.
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,
    /// Maximum feed document size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User-Agent header sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_retention_days() -> u32 {
    90
}

fn default_batch_size() -> usize {
    10
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_schedule_interval() -> u64 {
    600 // 10 minutes
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    "FeedBar-Server/1.0 (+https://feedbar.app)".to_string()
}

impl IngestConfig {
    /// Per-fetch timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Scheduler interval as a `Duration`.
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            batch_size: default_batch_size(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            schedule_interval_secs: default_schedule_interval(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Ingestion engine configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedbarError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedbarError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDBAR_DATABASE_PATH`: database file path
    /// - `FEEDBAR_RETENTION_DAYS`: retention window in days
    /// - `FEEDBAR_BATCH_SIZE`: feeds per scheduler invocation
    /// - `FEEDBAR_FETCH_TIMEOUT_MS`: per-fetch timeout in milliseconds
    /// - `FEEDBAR_LOG_LEVEL`: log level
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(path) = env_value("FEEDBAR_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(days) = env_number("FEEDBAR_RETENTION_DAYS")? {
            self.ingest.retention_days = days;
        }
        if let Some(size) = env_number("FEEDBAR_BATCH_SIZE")? {
            self.ingest.batch_size = size;
        }
        if let Some(timeout) = env_number("FEEDBAR_FETCH_TIMEOUT_MS")? {
            self.ingest.fetch_timeout_ms = timeout;
        }
        if let Some(level) = env_value("FEEDBAR_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.batch_size == 0 {
            return Err(FeedbarError::Validation(
                "ingest.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.ingest.retention_days == 0 {
            return Err(FeedbarError::Validation(
                "ingest.retention_days must be greater than 0".to_string(),
            ));
        }
        if self.ingest.retention_days > MAX_RETENTION_DAYS {
            return Err(FeedbarError::Validation(format!(
                "ingest.retention_days must be at most {MAX_RETENTION_DAYS}"
            )));
        }
        if self.ingest.fetch_timeout_ms == 0 {
            return Err(FeedbarError::Validation(
                "ingest.fetch_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.ingest.schedule_interval_secs == 0 {
            return Err(FeedbarError::Validation(
                "ingest.schedule_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_value(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FeedbarError::Config(format!("{name} is not a valid number: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/feedbar.db");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/feedbar.log");

        assert_eq!(config.ingest.retention_days, 90);
        assert_eq!(config.ingest.batch_size, 10);
        assert_eq!(config.ingest.fetch_timeout_ms, 5000);
        assert_eq!(config.ingest.schedule_interval_secs, 600);
        assert_eq!(config.ingest.max_feed_size_bytes, 5 * 1024 * 1024);
        assert!(config.ingest.user_agent.starts_with("FeedBar-Server/1.0"));
        assert_eq!(config.ingest.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.ingest.schedule_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[database]
path = "custom/feeds.sqlite"

[logging]
level = "debug"
file = "custom/logs/ingest.log"

[ingest]
retention_days = 30
batch_size = 25
fetch_timeout_ms = 2500
schedule_interval_secs = 120
max_feed_size_bytes = 1048576
user_agent = "TestAgent/2.0"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.database.path, "custom/feeds.sqlite");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/ingest.log");
        assert_eq!(config.ingest.retention_days, 30);
        assert_eq!(config.ingest.batch_size, 25);
        assert_eq!(config.ingest.fetch_timeout_ms, 2500);
        assert_eq!(config.ingest.schedule_interval_secs, 120);
        assert_eq!(config.ingest.max_feed_size_bytes, 1048576);
        assert_eq!(config.ingest.user_agent, "TestAgent/2.0");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[ingest]
batch_size = 3
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.ingest.batch_size, 3);
        assert_eq!(config.ingest.retention_days, 90);
        assert_eq!(config.ingest.fetch_timeout_ms, 5000);
        assert_eq!(config.database.path, "data/feedbar.db");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.ingest.batch_size, 10);
        assert_eq!(config.database.path, "data/feedbar.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(FeedbarError::Validation(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FeedbarError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        std::env::set_var("FEEDBAR_RETENTION_DAYS", "14");
        std::env::set_var("FEEDBAR_BATCH_SIZE", "4");
        std::env::set_var("FEEDBAR_FETCH_TIMEOUT_MS", "");

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.ingest.retention_days, 14);
        assert_eq!(config.ingest.batch_size, 4);
        // Empty value leaves the default in place
        assert_eq!(config.ingest.fetch_timeout_ms, 5000);

        std::env::set_var("FEEDBAR_BATCH_SIZE", "lots");
        let mut config = Config::default();
        let result = config.apply_env_overrides();
        assert!(matches!(result, Err(FeedbarError::Config(_))));

        std::env::remove_var("FEEDBAR_RETENTION_DAYS");
        std::env::remove_var("FEEDBAR_BATCH_SIZE");
        std::env::remove_var("FEEDBAR_FETCH_TIMEOUT_MS");
    }

    #[test]
    fn test_validate_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = Config::default();
        config.ingest.batch_size = 0;

        let result = config.validate();
        if let Err(FeedbarError::Validation(msg)) = result {
            assert!(msg.contains("batch_size"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_validate_retention_upper_bound() {
        let mut config = Config::default();
        config.ingest.retention_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());

        config.ingest.retention_days = u32::MAX;
        let result = config.validate();
        if let Err(FeedbarError::Validation(msg)) = result {
            assert!(msg.contains("retention_days"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.ingest.fetch_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
