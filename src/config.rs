//! Configuration loading and validation.
//!
//! Configuration is read from a TOML file. Every key is optional; missing
//! sections fall back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Constructor options for an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Subscribers per event type before a leak warning is logged.
    pub max_listeners: usize,
    pub queue_capacity: usize,
    pub health_check_interval_ms: u64,
    /// Deadline for timed operations created without an explicit timeout.
    pub default_timeout_ms: u64,
    pub enable_logging: bool,
    pub enable_metrics: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_listeners: 100,
            queue_capacity: 10_000,
            health_check_interval_ms: 30_000,
            default_timeout_ms: 30_000,
            enable_logging: true,
            enable_metrics: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// `None` when timeouts are disabled (`default_timeout_ms = 0`).
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_ms > 0).then(|| Duration::from_millis(self.default_timeout_ms))
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.health_check_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "health_check_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_listeners == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_listeners",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.orchestrator.validate()?;
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("expected 'pretty' or 'json', got '{}'", self.logging.format),
            }
            .into());
        }
        Ok(())
    }

    /// Install logging as configured.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.orchestrator.queue_capacity, 10_000);
        assert_eq!(config.orchestrator.max_listeners, 100);
        assert_eq!(
            config.orchestrator.health_check_interval(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [orchestrator]
            queue_capacity = 64
            enable_metrics = false
            "#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.queue_capacity, 64);
        assert!(!config.orchestrator.enable_metrics);
        assert!(config.orchestrator.enable_logging);
        assert_eq!(config.orchestrator.default_timeout_ms, 30_000);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = Config::parse("[orchestrator]\nqueue_capacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "queue_capacity",
                ..
            })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("[orchestrator]\nqueue_size = 10\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn bad_log_format_is_rejected() {
        let err = Config::parse("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "logging.format",
                ..
            })
        ));
    }

    #[test]
    fn zero_default_timeout_disables_deadline() {
        let config = OrchestratorConfig {
            default_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.default_timeout(), None);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[orchestrator]\nhealth_check_interval_ms = 500").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.orchestrator.health_check_interval(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
    }
}
