//! Session pool sizing and timing settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_max_restarts, default_queue_capacity, default_sessions, default_shutdown_grace_ms,
    duration_millis,
};

/// Configuration for the engine session pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Number of engine sessions to run concurrently.
    #[serde(default = "default_sessions")]
    pub sessions: usize,
    /// Jobs allowed to wait in the shared queue before submitters block.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Deadline applied to `submit` when the caller does not pass one.
    #[serde(default)]
    pub submit_timeout_ms: Option<u64>,
    /// Time an engine gets to exit after the termination frame before it is killed.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Consecutive replacement attempts a worker makes before it retires.
    ///
    /// Only failed spawns or greetings count; a replacement that starts
    /// resets the count. Zero disables replacement entirely.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

impl PoolConfig {
    /// Sets the number of sessions.
    #[must_use]
    pub const fn with_sessions(mut self, sessions: usize) -> Self {
        self.sessions = sessions;
        self
    }

    /// Sets the default submit deadline.
    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout_ms = Some(duration_millis(timeout));
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = duration_millis(grace);
        self
    }

    /// Default submit deadline, if any.
    #[must_use]
    pub const fn submit_timeout(&self) -> Option<Duration> {
        match self.submit_timeout_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }

    /// Grace period granted to an engine after the termination frame.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            queue_capacity: default_queue_capacity(),
            submit_timeout_ms: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
            max_restarts: default_max_restarts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn defaults_run_one_session_without_deadline() {
        let config = PoolConfig::default();

        assert_eq!(config.sessions, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.submit_timeout(), None);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.max_restarts, 3);
    }

    #[rstest]
    #[case(Duration::from_millis(250), 250)]
    #[case(Duration::from_secs(3), 3_000)]
    fn submit_timeout_round_trips_through_millis(#[case] timeout: Duration, #[case] ms: u64) {
        let config = PoolConfig::default().with_submit_timeout(timeout);

        assert_eq!(config.submit_timeout_ms, Some(ms));
        assert_eq!(config.submit_timeout(), Some(timeout));
    }
}
