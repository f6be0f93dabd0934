//! Lifecycle states of an engine session.

use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Spawned -> Ready -> Busy -> Ready -> ... -> Ending -> Closed
/// ```
///
/// A session whose stream desynchronises or whose engine disappears moves
/// straight to `Closed` and must be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The engine process is running but its greeting has not been read.
    Spawned,
    /// Waiting for a job.
    Ready,
    /// A job has been written and its response is outstanding.
    Busy,
    /// The termination frame has been sent.
    Ending,
    /// The engine has exited or was killed.
    Closed,
}

impl SessionState {
    /// Returns the lower-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spawned => "spawned",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Ending => "ending",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
