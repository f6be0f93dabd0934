//! Built-in configuration defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Engine executable launched for every session.
pub const DEFAULT_ENGINE_COMMAND: &str = "prince";

/// Flag switching the engine into its stdio control mode.
pub const DEFAULT_ENGINE_CONTROL_FLAG: &str = "--control";

/// Number of engine sessions started by a pool.
pub const DEFAULT_SESSIONS: usize = 1;

/// Number of jobs that may wait in the queue before `submit` blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Time an engine gets to exit after the termination frame.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2_000;

/// Consecutive replacement attempts a worker makes before it retires.
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Time a freshly spawned engine gets to send its greeting.
pub const DEFAULT_GREETING_TIMEOUT_MS: u64 = 10_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default engine command.
#[must_use]
pub fn default_engine_command() -> PathBuf {
    PathBuf::from(DEFAULT_ENGINE_COMMAND)
}

/// Default engine arguments.
#[must_use]
pub fn default_engine_args() -> Vec<String> {
    vec![DEFAULT_ENGINE_CONTROL_FLAG.to_owned()]
}

pub(crate) const fn default_sessions() -> usize {
    DEFAULT_SESSIONS
}

pub(crate) const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

pub(crate) const fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

pub(crate) const fn default_max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}

pub(crate) const fn default_greeting_timeout_ms() -> u64 {
    DEFAULT_GREETING_TIMEOUT_MS
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
