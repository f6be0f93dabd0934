//! A diagnostics sink that remembers what it was told.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use princepdf::DiagnosticSink;

/// One diagnostic delivered by an engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Greeting read at session start.
    Greeting {
        /// Session identifier.
        session: usize,
        /// Greeting text.
        text: String,
    },
    /// Payload of a `log` frame.
    Log {
        /// Session identifier.
        session: usize,
        /// Log text.
        text: String,
    },
    /// A line written to standard error.
    Stderr {
        /// Session identifier.
        session: usize,
        /// Line text.
        text: String,
    },
}

/// Records every diagnostic for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DiagnosticEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().clone()
    }

    /// Polls until an event satisfies `predicate` or `timeout` elapses.
    #[must_use]
    pub fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&DiagnosticEvent) -> bool,
    ) -> Option<DiagnosticEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.lock().iter().find(|event| predicate(event)) {
                return Some(event.clone());
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn record(&self, event: DiagnosticEvent) {
        self.lock().push(event);
    }
}

impl DiagnosticSink for RecordingSink {
    fn engine_greeting(&self, session: usize, greeting: &str) {
        self.record(DiagnosticEvent::Greeting {
            session,
            text: greeting.to_owned(),
        });
    }

    fn engine_log(&self, session: usize, log: &str) {
        self.record(DiagnosticEvent::Log {
            session,
            text: log.to_owned(),
        });
    }

    fn engine_stderr(&self, session: usize, line: &str) {
        self.record(DiagnosticEvent::Stderr {
            session,
            text: line.to_owned(),
        });
    }
}
