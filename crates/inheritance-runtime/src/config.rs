//! # Runtime Configuration
//!
//! Process-level settings. Inheritance policy itself lives in the
//! configuration document, not here.

use metadata_inheritance::DEFAULT_MAX_CONCURRENT_JOBS;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::env;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be at least 1")]
    ZeroLimit { var: &'static str },

    #[error("INHERIT_REPOSITORY must not be empty")]
    EmptyRepository,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Repository the listener handles events for.
    pub repository: String,
    /// Upper bound on concurrently running propagation jobs.
    pub max_concurrent_jobs: usize,
    /// Event bus buffer per subscriber.
    pub event_capacity: usize,
    /// `EnvFilter` directive.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            repository: "default".to_string(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `INHERIT_REPOSITORY`: repository name (default: default)
    /// - `INHERIT_MAX_CONCURRENT_JOBS`: job concurrency (default: 4)
    /// - `INHERIT_EVENT_CAPACITY`: bus buffer (default: 1000)
    /// - `INHERIT_LOG_LEVEL` or `RUST_LOG`: log filter (default: info)
    /// - `INHERIT_JSON_LOGS`: JSON log output (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let number = |var: &'static str, default: usize| -> Result<usize, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { var, value }),
            }
        };

        let config = Self {
            repository: lookup("INHERIT_REPOSITORY")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.repository),
            max_concurrent_jobs: number("INHERIT_MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)?,
            event_capacity: number("INHERIT_EVENT_CAPACITY", defaults.event_capacity)?,
            log_level: lookup("INHERIT_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("INHERIT_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.json_logs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.is_empty() {
            return Err(ConfigError::EmptyRepository);
        }
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::ZeroLimit {
                var: "INHERIT_MAX_CONCURRENT_JOBS",
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroLimit {
                var: "INHERIT_EVENT_CAPACITY",
            });
        }
        Ok(())
    }
}
