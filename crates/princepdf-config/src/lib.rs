//! Shared configuration for the princepdf engine pool and its binaries.
//!
//! Configuration is resolved in layers: built-in defaults, then an optional
//! JSON configuration file, then environment and command-line overrides
//! applied by the binaries. This crate owns the first two layers and the
//! validation that every layer must pass before a pool is started.

mod defaults;
mod engine;
mod logging;
mod pool;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ENGINE_COMMAND, DEFAULT_ENGINE_CONTROL_FLAG, DEFAULT_GREETING_TIMEOUT_MS,
    DEFAULT_LOG_FILTER, DEFAULT_MAX_RESTARTS, DEFAULT_QUEUE_CAPACITY, DEFAULT_SESSIONS,
    DEFAULT_SHUTDOWN_GRACE_MS, default_engine_args, default_engine_command, default_log_filter, default_log_filter_string, default_log_format,
};
pub use engine::EngineConfig;
pub use logging::{LogFormat, LogFormatParseError};
pub use pool::PoolConfig;

/// Resolved configuration shared by the pool and the binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// How engine processes are launched.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Pool sizing and timing.
    #[serde(default)]
    pub pool: PoolConfig,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            pool: PoolConfig::default(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads a configuration file, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not valid JSON for this schema, and
    /// [`ConfigError::Invalid`] when the values fail validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = path.as_ref();
        let raw = fs::read(file).map_err(|source| ConfigError::Read {
            path: file.to_path_buf(),
            source: Arc::new(source),
        })?;
        let config: Self = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: file.to_path_buf(),
            source: Arc::new(source),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the pool relies upon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.command.as_os_str().is_empty() {
            return Err(ConfigError::invalid("engine.command must not be empty"));
        }
        if self.pool.sessions == 0 {
            return Err(ConfigError::invalid("pool.sessions must be at least 1"));
        }
        if self.pool.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "pool.queue_capacity must be at least 1",
            ));
        }
        Ok(())
    }

    /// Engine launch settings.
    #[must_use]
    pub const fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Pool settings.
    #[must_use]
    pub const fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    /// Log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The configuration file is not valid JSON for the schema.
    #[error("failed to parse configuration file '{}': {source}", .path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// A value violates a configuration rule.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the violated rule.
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
