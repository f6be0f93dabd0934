//! Engine process launch settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_engine_args, default_engine_command, default_greeting_timeout_ms, duration_millis,
};

/// Configuration for spawning an engine process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// The executable path or command name.
    #[serde(default = "default_engine_command")]
    pub command: PathBuf,
    /// Arguments passed to the engine. Must select the control protocol.
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Milliseconds a new engine has to send its greeting before it is killed.
    #[serde(default = "default_greeting_timeout_ms")]
    pub greeting_timeout_ms: u64,
}

impl EngineConfig {
    /// Creates a configuration launching `command` with `args`.
    #[must_use]
    pub fn new<I, S>(command: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            greeting_timeout_ms: default_greeting_timeout_ms(),
        }
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the greeting deadline.
    #[must_use]
    pub fn with_greeting_timeout(mut self, timeout: Duration) -> Self {
        self.greeting_timeout_ms = duration_millis(timeout);
        self
    }

    /// Deadline for the engine's greeting.
    #[must_use]
    pub const fn greeting_timeout(&self) -> Duration {
        Duration::from_millis(self.greeting_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: default_engine_args(),
            working_dir: None,
            greeting_timeout_ms: default_greeting_timeout_ms(),
        }
    }
}
