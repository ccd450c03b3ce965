//! Structured logging setup
//!
//! Library code only emits `tracing` events. Binaries call [`init`] once to
//! install a subscriber writing to stderr, so stdout stays free for JSON
//! responses.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit one JSON object per event
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn is_valid_level(&self) -> bool {
        LEVELS.contains(&self.level.to_ascii_lowercase().as_str())
    }

    fn max_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }
}

/// Installs the global subscriber. Returns false when one is already set.
pub fn init(config: &LoggingConfig) -> bool {
    let level = config.max_level().as_str().to_ascii_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aasregistry={}", level)));

    let installed = if config.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert_eq!(config.max_level(), Level::INFO);
    }

    #[test]
    fn test_level_validation() {
        let mut config = LoggingConfig::default();
        config.level = "DEBUG".into();
        assert!(config.is_valid_level());
        assert_eq!(config.max_level(), Level::DEBUG);

        config.level = "loud".into();
        assert!(!config.is_valid_level());
    }

    #[test]
    fn test_repeated_init_is_tolerated() {
        let config = LoggingConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
