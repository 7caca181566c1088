//! Harness configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [endpoints]
//! queue = "zk1:2181"
//!
//! [word_count]
//! table = "WordCount"
//!
//! [verification]
//! timeout_ms = 30000
//! ```

use crate::context::TestContext;
use crate::errors::ConfigError;
use crate::scenario::WordCountConfig;
use crate::verify::VerificationPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTestConfig {
    /// External system endpoints.
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Word-count scenario names.
    #[serde(default)]
    pub word_count: WordCountConfig,

    /// Verification polling bounds.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the external systems live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Queue coordination endpoint (broker list).
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Execution engine endpoint.
    #[serde(default = "default_compute")]
    pub compute: String,

    /// File store URL.
    #[serde(default = "default_file_store")]
    pub file_store: String,

    /// Table store URL.
    #[serde(default = "default_table_store")]
    pub table_store: String,
}

fn default_queue() -> String {
    "localhost:2181".to_string()
}

fn default_compute() -> String {
    "localhost:6627".to_string()
}

fn default_file_store() -> String {
    "hdfs://localhost:8020".to_string()
}

fn default_table_store() -> String {
    "localhost:2181".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            queue: default_queue(),
            compute: default_compute(),
            file_store: default_file_store(),
            table_store: default_table_store(),
        }
    }
}

/// Verification bounds in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Upper bound on waiting for sink state.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Log level and format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// "json" or "pretty".
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl SmokeTestConfig {
    /// Reads and validates a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be one of: {}",
                LOG_FORMATS.join(", ")
            )));
        }
        if self.verification.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "verification.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.verification.poll_interval_ms > self.verification.timeout_ms {
            return Err(ConfigError::Invalid(
                "verification.poll_interval_ms must not exceed timeout_ms".to_string(),
            ));
        }
        if self.word_count.rotate_every == 0 {
            return Err(ConfigError::Invalid(
                "word_count.rotate_every must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the context for one run.
    #[must_use]
    pub fn context(&self) -> TestContext {
        TestContext::new(
            &self.endpoints.queue,
            &self.endpoints.compute,
            &self.endpoints.file_store,
            &self.endpoints.table_store,
        )
    }

    /// Returns the verification policy.
    #[must_use]
    pub fn verification_policy(&self) -> VerificationPolicy {
        VerificationPolicy::new(
            Duration::from_millis(self.verification.timeout_ms),
            Duration::from_millis(self.verification.poll_interval_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SmokeTestConfig::from_toml_str("").unwrap();
        assert_eq!(config, SmokeTestConfig::default());
        assert_eq!(config.word_count.topic, "storm-smoke-test-tmp");
        assert_eq!(
            config.verification_policy(),
            VerificationPolicy::new(Duration::from_secs(60), Duration::from_millis(500))
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = SmokeTestConfig::from_toml_str(
            r#"
            [endpoints]
            queue = "zk1:2181,zk2:2181"

            [word_count]
            table = "Counts"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.queue, "zk1:2181,zk2:2181");
        assert_eq!(config.endpoints.compute, "localhost:6627");
        assert_eq!(config.word_count.table, "Counts");
        assert_eq!(config.word_count.column_family, "columnFamily");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.context().queue_endpoint(), "zk1:2181,zk2:2181");
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = SmokeTestConfig::from_toml_str("[logging]\nformat = \"xml\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("logging.format")));

        let err = SmokeTestConfig::from_toml_str(
            "[verification]\ntimeout_ms = 100\npoll_interval_ms = 500",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SmokeTestConfig::from_toml_str("[endpoints\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verification]\ntimeout_ms = 5000").unwrap();

        let config = tokio_test::block_on(SmokeTestConfig::load(file.path())).unwrap();
        assert_eq!(config.verification.timeout_ms, 5000);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SmokeTestConfig::load(dir.path().join("missing.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
