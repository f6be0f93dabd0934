//! Routing of engine diagnostics.
//!
//! Engines talk back on three channels besides the document itself: the
//! greeting sent at start-up, the `log` frame paired with every result, and
//! free-form lines on standard error. All three are handed to a
//! [`DiagnosticSink`] injected into the pool, so embedders decide where the
//! text ends up.

use std::sync::Arc;

/// Log target for engine-originated diagnostics.
pub const ENGINE_TARGET: &str = "princepdf::engine";

/// Observer receiving diagnostics emitted by engine sessions.
///
/// Implementations are called from session control threads and stderr
/// drain threads concurrently.
pub trait DiagnosticSink: Send + Sync {
    /// Invoked with the greeting read when a session starts.
    fn engine_greeting(&self, session: usize, greeting: &str);

    /// Invoked with the payload of each `log` frame.
    fn engine_log(&self, session: usize, log: &str);

    /// Invoked with each line the engine writes to standard error.
    fn engine_stderr(&self, session: usize, line: &str);
}

impl<T> DiagnosticSink for Arc<T>
where
    T: DiagnosticSink + ?Sized,
{
    fn engine_greeting(&self, session: usize, greeting: &str) {
        (**self).engine_greeting(session, greeting);
    }

    fn engine_log(&self, session: usize, log: &str) {
        (**self).engine_log(session, log);
    }

    fn engine_stderr(&self, session: usize, line: &str) {
        (**self).engine_stderr(session, line);
    }
}

/// Default sink forwarding diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    /// Builds a new sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn engine_greeting(&self, session: usize, greeting: &str) {
        tracing::info!(
            target: ENGINE_TARGET,
            session,
            greeting,
            "engine session ready"
        );
    }

    fn engine_log(&self, session: usize, log: &str) {
        // Empty logs accompany every clean render.
        if log.trim().is_empty() {
            return;
        }
        for line in log.lines() {
            tracing::info!(target: ENGINE_TARGET, session, "{line}");
        }
    }

    fn engine_stderr(&self, session: usize, line: &str) {
        tracing::warn!(target: ENGINE_TARGET, session, stream = "stderr", "{line}");
    }
}
