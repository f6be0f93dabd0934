//! Errors raised by the codec, engine sessions, and the pool.
//!
//! Per-job failures are reported to the submitting caller as [`JobError`];
//! failures that concern the pool itself surface as [`PoolError`]. I/O and
//! JSON errors are wrapped in `Arc` to keep the enums cheap to move.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use princepdf_config::ConfigError;
use thiserror::Error;

/// Violations of the engine's framing rules.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The engine closed its output stream before a header arrived.
    #[error("engine closed its output stream")]
    Closed,

    /// A header line contained no tokens.
    #[error("empty frame header")]
    EmptyHeader,

    /// The length token of a header is not a decimal integer.
    #[error("invalid frame length in header '{header}'")]
    InvalidLength {
        /// Header line as received.
        header: String,
    },

    /// The stream ended before the announced payload was read.
    #[error("short read on '{kind}' frame: expected {expected} bytes")]
    ShortRead {
        /// Kind token of the truncated frame.
        kind: String,
        /// Announced payload length.
        expected: u64,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The byte after the payload was not a newline.
    #[error("missing newline after '{kind}' frame payload")]
    MissingTerminator {
        /// Kind token of the malformed frame.
        kind: String,
    },

    /// A document frame was not followed by its diagnostic log.
    #[error("expected 'log' frame after 'pdf', received '{found}'")]
    UnpairedDocument {
        /// Kind token received instead of `log`.
        found: String,
    },

    /// Reading from or writing to the engine streams failed.
    #[error("engine stream I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl FrameError {
    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io(Arc::new(source))
    }

    /// Reports whether the failure means the engine process is gone.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Closed | Self::ShortRead { .. } => true,
            Self::Io(source) => matches!(
                source.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
            ),
            Self::EmptyHeader
            | Self::InvalidLength { .. }
            | Self::MissingTerminator { .. }
            | Self::UnpairedDocument { .. } => false,
        }
    }
}

/// Outcome of reading one logical engine response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The response violated the framing rules.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The engine reported a job failure with an `err` frame.
    #[error("engine reported: {message}")]
    Engine {
        /// Text of the `err` frame payload.
        message: String,
    },
}

/// Failure of a single submitted job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The wire request could not be serialised.
    #[error("failed to build engine request: {0}")]
    Build(#[source] Arc<serde_json::Error>),

    /// The engine response could not be decoded.
    #[error("protocol error on engine session {session}: {source}")]
    Frame {
        /// Session that produced the malformed response.
        session: usize,
        /// Framing violation.
        #[source]
        source: FrameError,
    },

    /// The engine rejected the job.
    #[error("prince error: {message}")]
    Engine {
        /// Engine-provided failure text.
        message: String,
    },

    /// The engine process exited or its streams broke mid-job.
    #[error("engine session {session} lost: {reason}")]
    SessionLost {
        /// Session whose engine disappeared.
        session: usize,
        /// Description of the failure.
        reason: String,
    },

    /// No result arrived before the caller's deadline.
    #[error("job timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The pool is stopped or was never started.
    #[error("engine pool is not accepting jobs")]
    PoolClosed,

    /// The engine answered with something other than a document.
    #[error("engine returned a '{kind}' response instead of a document")]
    UnexpectedResponse {
        /// Kind of the response received.
        kind: String,
    },
}

impl JobError {
    /// Wraps a request serialisation failure.
    #[must_use]
    pub fn build(source: serde_json::Error) -> Self {
        Self::Build(Arc::new(source))
    }

    /// Creates a timeout error for the given deadline.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Attributes a response failure to `session`.
    ///
    /// Stream failures that mean the engine is gone become
    /// [`JobError::SessionLost`]; other framing violations stay
    /// [`JobError::Frame`].
    #[must_use]
    pub fn from_response(session: usize, error: ResponseError) -> Self {
        match error {
            ResponseError::Engine { message } => Self::Engine { message },
            ResponseError::Frame(source) if source.is_disconnect() => Self::SessionLost {
                session,
                reason: source.to_string(),
            },
            ResponseError::Frame(source) => Self::Frame { session, source },
        }
    }

    /// Reports whether the session that produced this error must be replaced.
    #[must_use]
    pub const fn poisons_session(&self) -> bool {
        matches!(self, Self::Frame { .. } | Self::SessionLost { .. })
    }
}

/// Failure to bring an engine session up.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine executable does not exist.
    #[error("engine binary not found: {command}")]
    BinaryNotFound {
        /// Command that was looked up.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The engine process could not be started.
    #[error("failed to start engine '{command}': {message}")]
    SpawnFailed {
        /// Command that was launched.
        command: String,
        /// Description of the failure.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The engine did not produce a readable greeting.
    #[error("engine session {session} sent no greeting: {source}")]
    Greeting {
        /// Session identifier.
        session: usize,
        /// Framing failure while reading the greeting.
        #[source]
        source: FrameError,
    },

    /// The engine did not greet before its deadline and was killed.
    #[error("engine session {session} sent no greeting within {timeout_ms}ms")]
    GreetingTimeout {
        /// Session identifier.
        session: usize,
        /// Deadline that passed, in milliseconds.
        timeout_ms: u128,
    },
}

/// Failure of a pool-level operation.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool configuration is unusable.
    #[error("invalid pool configuration: {0}")]
    Config(#[from] ConfigError),

    /// A session could not be started.
    #[error("failed to start engine session {index}: {source}")]
    Spawn {
        /// Index of the failing session.
        index: usize,
        /// Session start-up failure.
        #[source]
        source: SessionError,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread {index}: {source}")]
    WorkerThread {
        /// Index of the worker.
        index: usize,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// `start` was called on a running or stopped pool.
    #[error("engine pool has already been started")]
    AlreadyStarted,

    /// `stop` was called on a pool that never started.
    #[error("engine pool has not been started")]
    NotStarted,
}

#[cfg(test)]
mod tests;
