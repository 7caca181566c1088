//! Tracing subscriber setup for the binary.

use crate::config::LoggingConfig;
use crate::errors::ConfigError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Call once, before any events
/// are emitted.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        other => {
            return Err(ConfigError::Invalid(format!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            )))
        }
    };

    result.map_err(|e| ConfigError::Invalid(format!("failed to initialize tracing: {e}")))
}
