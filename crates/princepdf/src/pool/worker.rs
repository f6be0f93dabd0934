//! Supervisor loop owning one engine session.
//!
//! Every worker blocks on the shared queue; whichever worker receives a
//! ticket first serves it. A worker replaces its session whenever the engine
//! exits or its stream can no longer be trusted. It retires once
//! `max_restarts` consecutive replacement attempts have failed; a
//! replacement that starts resets the count. The last worker to leave closes
//! the queue and answers whatever is still waiting in it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_channel::Receiver;
use princepdf_config::EngineConfig;
use tracing::{debug, error, info, warn};

use super::POOL_TARGET;
use super::ticket::{Reply, Ticket, drain_queue};
use crate::diagnostics::DiagnosticSink;
use crate::error::{JobError, SessionError};
use crate::session::{EngineSession, ProcessHandle};

/// Spawns a session and reads its greeting.
///
/// The process is published through `active` before the greeting is read,
/// so shutdown can kill an engine that never greets.
pub(crate) fn start_session(
    id: usize,
    engine: &EngineConfig,
    diagnostics: &Arc<dyn DiagnosticSink>,
    active: &ActiveProcess,
) -> Result<EngineSession, SessionError> {
    let mut session = EngineSession::spawn(id, engine, Arc::clone(diagnostics))?;
    active.set(Some(session.process()));
    if let Err(error) = session.greet() {
        active.set(None);
        return Err(error);
    }
    Ok(session)
}

/// The engine a worker is currently driving, visible to the pool so a
/// stuck worker can be unblocked during shutdown.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveProcess(Arc<Mutex<Option<ProcessHandle>>>);

impl ActiveProcess {
    fn lock(&self) -> MutexGuard<'_, Option<ProcessHandle>> {
        self.0.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) fn set(&self, process: Option<ProcessHandle>) {
        *self.lock() = process;
    }

    /// Kills the current engine, if any.
    pub(crate) fn kill(&self) {
        let process = self.lock().clone();
        if let Some(process) = process {
            process.kill();
        }
    }
}

/// Settings and channels a worker thread needs.
pub(crate) struct Worker {
    pub(crate) index: usize,
    pub(crate) engine: EngineConfig,
    pub(crate) grace: Duration,
    pub(crate) max_restarts: u32,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
    pub(crate) jobs: Receiver<Ticket>,
    pub(crate) active: ActiveProcess,
    /// Workers of the pool still serving the queue.
    pub(crate) live: Arc<AtomicUsize>,
}

impl Worker {
    /// Serves tickets until the queue closes or the worker retires.
    pub(crate) fn run(self, initial: EngineSession) {
        let retired = self.serve_queue(initial);
        self.active.set(None);

        if self.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.jobs.close();
            let drained = drain_queue(&self.jobs, || {
                if retired {
                    self.retired_error()
                } else {
                    JobError::PoolClosed
                }
            });
            if drained > 0 {
                warn!(
                    target: POOL_TARGET,
                    worker = self.index,
                    drained,
                    "no worker left, failed queued jobs"
                );
            }
        }
        info!(
            target: POOL_TARGET,
            worker = self.index,
            retired,
            "worker stopped"
        );
    }

    /// Returns `true` if the worker retired rather than seeing the queue close.
    fn serve_queue(&self, initial: EngineSession) -> bool {
        let mut current = Some(initial);
        let mut retired = false;

        while let Ok(ticket) = self.jobs.recv_blocking() {
            if ticket.is_expired() {
                debug!(
                    target: POOL_TARGET,
                    worker = self.index,
                    "skipping job whose caller stopped waiting"
                );
                let reply = Err(ticket.timeout_error());
                ticket.respond(reply);
                continue;
            }

            let usable = match current.take() {
                Some(session) if session.is_ready() => Some(session),
                stale => self.replace(stale),
            };
            let Some(mut session) = usable else {
                let reply = Err(self.retired_error());
                ticket.respond(reply);
                retired = true;
                break;
            };
            let reply = Self::serve(&mut session, &ticket);
            ticket.respond(reply);

            if session.is_ready() {
                current = Some(session);
                continue;
            }
            if self.jobs.is_closed() && self.jobs.is_empty() {
                session.kill();
                break;
            }
            current = self.replace(Some(session));
            if current.is_none() {
                retired = true;
                break;
            }
        }

        if let Some(mut session) = current {
            session.end(self.grace);
        }
        retired
    }

    /// Swaps `stale` for a freshly started session.
    ///
    /// Returns `None` once `max_restarts` consecutive attempts have failed.
    fn replace(&self, stale: Option<EngineSession>) -> Option<EngineSession> {
        if let Some(mut session) = stale {
            warn!(
                target: POOL_TARGET,
                worker = self.index,
                state = %session.state(),
                "replacing engine session"
            );
            session.kill();
        }
        self.active.set(None);

        for attempt in 1..=self.max_restarts {
            match start_session(self.index, &self.engine, &self.diagnostics, &self.active) {
                Ok(session) => {
                    info!(
                        target: POOL_TARGET,
                        worker = self.index,
                        attempt,
                        "engine session replaced"
                    );
                    return Some(session);
                }
                Err(error) => {
                    warn!(
                        target: POOL_TARGET,
                        worker = self.index,
                        attempt,
                        max_restarts = self.max_restarts,
                        error = %error,
                        "failed to replace engine session"
                    );
                    // Shutdown kills engines mid-greeting; do not respawn them.
                    if self.jobs.is_closed() {
                        break;
                    }
                }
            }
        }

        error!(
            target: POOL_TARGET,
            worker = self.index,
            max_restarts = self.max_restarts,
            "engine could not be replaced, retiring worker"
        );
        None
    }

    fn serve(session: &mut EngineSession, ticket: &Ticket) -> Reply {
        if !ticket.claim.attach(session.process()) {
            return Err(ticket.timeout_error());
        }
        let reply = session.run(&ticket.job);
        ticket.claim.detach();
        reply
    }

    fn retired_error(&self) -> JobError {
        JobError::SessionLost {
            session: self.index,
            reason: "engine could not be restarted".to_owned(),
        }
    }
}
