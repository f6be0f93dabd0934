//! A single engine process driven through the control protocol.
//!
//! A session owns one engine child process. Jobs are serialised through it
//! strictly one at a time: `run` takes `&mut self`, writes the job, and
//! blocks until the matching response has been read. Standard error is
//! drained on a dedicated thread so a chatty engine can never stall on a
//! full pipe.

mod lifecycle;
mod state;

use std::io::{self, BufRead, BufReader, BufWriter};
use std::process::{ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use princepdf_config::EngineConfig;
use tracing::{debug, warn};

use lifecycle::KillTimer;
pub use lifecycle::ProcessHandle;
pub use state::SessionState;

use crate::diagnostics::DiagnosticSink;
use crate::error::{JobError, SessionError};
use crate::job::Job;
use crate::protocol::{EngineTransport, Output};
use crate::request::WireRequest;

/// Log target for session operations.
pub(crate) const SESSION_TARGET: &str = "princepdf::session";

type ChildTransport = EngineTransport<BufReader<ChildStdout>, BufWriter<ChildStdin>>;

/// One running engine process.
pub struct EngineSession {
    id: usize,
    state: SessionState,
    transport: ChildTransport,
    process: ProcessHandle,
    diagnostics: Arc<dyn DiagnosticSink>,
    version: Option<String>,
    greeting_timeout: Duration,
    stderr_drain: Option<JoinHandle<()>>,
}

impl EngineSession {
    /// Starts the engine described by `config`.
    ///
    /// The session is returned in [`SessionState::Spawned`]; call
    /// [`EngineSession::greet`] before running jobs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BinaryNotFound`] when the command does not
    /// exist and [`SessionError::SpawnFailed`] for any other start-up failure.
    pub fn spawn(
        id: usize,
        config: &EngineConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, SessionError> {
        let command_name = config.command.display().to_string();
        debug!(
            target: SESSION_TARGET,
            session = id,
            command = %command_name,
            args = ?config.args,
            "spawning engine"
        );

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                SessionError::BinaryNotFound {
                    command: command_name.clone(),
                    source: Arc::new(error),
                }
            } else {
                SessionError::SpawnFailed {
                    command: command_name.clone(),
                    message: "process could not be started".to_owned(),
                    source: Arc::new(error),
                }
            }
        })?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let process = ProcessHandle::new(id, child);
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            process.kill();
            return Err(SessionError::SpawnFailed {
                command: command_name,
                message: "failed to capture engine stdio".to_owned(),
                source: Arc::new(io::Error::other("missing pipe")),
            });
        };

        let stderr_drain = spawn_stderr_drain(id, stderr, Arc::clone(&diagnostics));
        debug!(
            target: SESSION_TARGET,
            session = id,
            pid = process.pid(),
            "engine spawned"
        );

        Ok(Self {
            id,
            state: SessionState::Spawned,
            transport: EngineTransport::new(BufReader::new(stdout), BufWriter::new(stdin)),
            process,
            diagnostics,
            version: None,
            greeting_timeout: config.greeting_timeout(),
            stderr_drain,
        })
    }

    /// Reads the greeting the engine sends on start-up.
    ///
    /// An engine that stays silent past the configured greeting timeout is
    /// killed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GreetingTimeout`] when the deadline passes and
    /// [`SessionError::Greeting`] when no well-formed frame arrives; the
    /// engine is killed in both cases.
    pub fn greet(&mut self) -> Result<(), SessionError> {
        let timer = self.process.kill_after(self.greeting_timeout);
        let received = self.transport.receive_frame();
        if timer.is_some_and(KillTimer::disarm) {
            warn!(
                target: SESSION_TARGET,
                session = self.id,
                timeout_ms = self.greeting_timeout.as_millis(),
                "engine sent no greeting in time"
            );
            self.kill();
            return Err(SessionError::GreetingTimeout {
                session: self.id,
                timeout_ms: self.greeting_timeout.as_millis(),
            });
        }

        match received {
            Ok(frame) => {
                let version = if frame.payload.is_empty() {
                    frame.kind.to_string()
                } else {
                    frame.text().trim_end().to_owned()
                };
                self.diagnostics.engine_greeting(self.id, &version);
                self.version = Some(version);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(source) => {
                self.kill();
                Err(SessionError::Greeting {
                    session: self.id,
                    source,
                })
            }
        }
    }

    /// Runs one job to completion.
    ///
    /// A framing violation or a lost engine leaves the session
    /// [`SessionState::Closed`] with its process killed; engine-reported
    /// failures keep it ready for the next job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Build`] before anything is written if the request
    /// cannot be serialised, [`JobError::Engine`] when the engine rejects the
    /// job, and [`JobError::Frame`] or [`JobError::SessionLost`] when the
    /// session can no longer be trusted.
    pub fn run(&mut self, job: &Job) -> Result<Output, JobError> {
        if self.state != SessionState::Ready {
            return Err(JobError::SessionLost {
                session: self.id,
                reason: format!("session is {}", self.state),
            });
        }

        let request = WireRequest::build(job);
        let header = request.to_json()?;
        self.state = SessionState::Busy;
        debug!(
            target: SESSION_TARGET,
            session = self.id,
            resources = request.resource_count(),
            "sending job"
        );

        let result = self.exchange(&header, request.resources());
        match &result {
            Err(error) if error.poisons_session() => {
                warn!(
                    target: SESSION_TARGET,
                    session = self.id,
                    error = %error,
                    "quarantining engine session"
                );
                self.kill();
            }
            _ => self.state = SessionState::Ready,
        }
        result
    }

    fn exchange(&mut self, header: &[u8], resources: &[&[u8]]) -> Result<Output, JobError> {
        let id = self.id;
        self.transport
            .send_job(header, resources)
            .map_err(|error| JobError::from_response(id, error.into()))?;
        let diagnostics = &self.diagnostics;
        self.transport
            .receive_response(|log| diagnostics.engine_log(id, &String::from_utf8_lossy(log)))
            .map_err(|error| JobError::from_response(id, error))
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Engine greeting, once read.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Handle for terminating the engine from another thread.
    #[must_use]
    pub fn process(&self) -> ProcessHandle {
        self.process.clone()
    }

    /// Reports whether the engine process has exited.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.process.has_exited()
    }

    /// Reports whether the session can accept a job right now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready && !self.has_exited()
    }

    /// Ends the session: sends the termination frame, then gives the engine
    /// `grace` to exit before killing it.
    ///
    /// Failures are logged, never returned.
    pub fn end(&mut self, grace: Duration) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Ending;
        if let Err(error) = self.transport.send_end() {
            debug!(
                target: SESSION_TARGET,
                session = self.id,
                error = %error,
                "failed to send termination frame"
            );
        }
        if !self.process.terminate(grace) {
            warn!(
                target: SESSION_TARGET,
                session = self.id,
                "engine ignored termination frame"
            );
        }
        self.close();
    }

    /// Kills the engine immediately.
    pub fn kill(&mut self) {
        self.process.kill();
        self.close();
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        // Descendants of the engine may still hold stderr open.
        if let Some(drain) = self.stderr_drain.take_if(|drain| drain.is_finished())
            && drain.join().is_err()
        {
            warn!(
                target: SESSION_TARGET,
                session = self.id,
                "stderr drain thread panicked"
            );
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.process.kill();
        }
    }
}

fn spawn_stderr_drain(
    session: usize,
    stderr: ChildStderr,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name(format!("princepdf-stderr-{session}"))
        .spawn(move || drain_stderr(session, stderr, diagnostics.as_ref()));
    match spawned {
        Ok(handle) => Some(handle),
        Err(error) => {
            warn!(
                target: SESSION_TARGET,
                session,
                error = %error,
                "failed to start stderr drain; engine stderr will be discarded"
            );
            None
        }
    }
}

fn drain_stderr(session: usize, stderr: ChildStderr, diagnostics: &dyn DiagnosticSink) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                diagnostics.engine_stderr(session, text.trim_end());
            }
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    session,
                    error = %error,
                    "failed to read engine stderr"
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests;
