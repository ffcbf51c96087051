//! Configuration loading and environment variable handling

use crate::domains::execution::ExecutionConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::RelayConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "RELAY".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<RelayConfig> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: RelayConfig = if content.trim().is_empty() {
            RelayConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<RelayConfig> {
        let mut config = RelayConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<RelayConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut RelayConfig) -> ConfigResult<()> {
        self.apply_execution_overrides(&mut config.execution)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply execution config overrides
    fn apply_execution_overrides(&self, config: &mut ExecutionConfig) -> ConfigResult<()> {
        if let Ok(program) = self.get_env_var("WORKER_PROGRAM") {
            config.worker_program = Some(PathBuf::from(program));
        }

        if let Ok(timeout) = self.get_env_var("DEFAULT_JOB_TIMEOUT") {
            let seconds: u64 = timeout.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid DEFAULT_JOB_TIMEOUT: {}", e))
            })?;
            config.default_job_timeout = Some(Duration::from_secs(seconds));
        }

        if let Ok(grace) = self.get_env_var("EXIT_GRACE_SECONDS") {
            let seconds: u64 = grace.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid EXIT_GRACE_SECONDS: {}", e))
            })?;
            config.exit_grace_period = Duration::from_secs(seconds);
        }

        if let Ok(trace) = self.get_env_var("TRACE") {
            config.trace = trace
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid TRACE: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: [&str; 6] = [
        "RELAY_WORKER_PROGRAM",
        "RELAY_DEFAULT_JOB_TIMEOUT",
        "RELAY_EXIT_GRACE_SECONDS",
        "RELAY_TRACE",
        "RELAY_LOG_LEVEL",
        "RELAY_LOG_FORMAT",
    ];

    fn without_relay_env<F: FnOnce()>(f: F) {
        let unset: Vec<(&str, Option<&str>)> = ENV_KEYS.iter().map(|k| (*k, None)).collect();
        temp_env::with_vars(unset, f);
    }

    #[test]
    fn test_from_env_defaults() {
        without_relay_env(|| {
            let config = ConfigLoader::new().from_env().unwrap();
            assert_eq!(config, RelayConfig::default());
        });
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("RELAY_WORKER_PROGRAM", Some("/usr/local/bin/relay")),
                ("RELAY_DEFAULT_JOB_TIMEOUT", Some("45")),
                ("RELAY_EXIT_GRACE_SECONDS", Some("2")),
                ("RELAY_TRACE", Some("true")),
                ("RELAY_LOG_LEVEL", Some("debug")),
                ("RELAY_LOG_FORMAT", Some("json")),
            ],
            || {
                let config = ConfigLoader::new().from_env().unwrap();
                assert_eq!(
                    config.execution.worker_program,
                    Some(PathBuf::from("/usr/local/bin/relay"))
                );
                assert_eq!(
                    config.execution.default_job_timeout,
                    Some(Duration::from_secs(45))
                );
                assert_eq!(config.execution.exit_grace_period, Duration::from_secs(2));
                assert!(config.execution.trace);
                assert_eq!(config.logging.level, LogLevel::Debug);
                assert_eq!(config.logging.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_invalid_env_value() {
        temp_env::with_var("RELAY_DEFAULT_JOB_TIMEOUT", Some("soon"), || {
            let err = ConfigLoader::new().from_env().unwrap_err();
            assert!(matches!(err, ConfigError::EnvError(_)));
        });
    }

    #[test]
    fn test_custom_prefix() {
        temp_env::with_var("RUNNER_TRACE", Some("true"), || {
            let config = ConfigLoader::with_prefix("RUNNER").from_env().unwrap();
            assert!(config.execution.trace);
        });
    }

    #[test]
    fn test_from_file_with_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "execution:\n  default_job_timeout: 10\n  sandbox:\n    region: eu\nlogging:\n  level: warn"
        )
        .unwrap();

        without_relay_env(|| {
            temp_env::with_var("RELAY_LOG_LEVEL", Some("trace"), || {
                let config = ConfigLoader::new().load(Some(file.path())).unwrap();
                assert_eq!(
                    config.execution.default_job_timeout,
                    Some(Duration::from_secs(10))
                );
                assert_eq!(config.execution.sandbox["region"], "eu");
                assert_eq!(config.logging.level, LogLevel::Trace);
            });
        });
    }

    #[test]
    fn test_from_file_rejects_invalid_domain() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "execution:\n  sandbox: [1, 2]").unwrap();

        without_relay_env(|| {
            let err = ConfigLoader::new().from_file(file.path()).unwrap_err();
            assert!(matches!(err, ConfigError::DomainError { .. }));
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .from_file("/nonexistent/relay.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }
}
