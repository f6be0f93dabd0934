//! A fixed-size pool of engine sessions behind one bounded job queue.
//!
//! Dispatch policy is first-ready-worker-wins: every worker blocks on the
//! same queue and whichever receives a job first serves it. There is no
//! fairness or priority between jobs beyond queue order. Callers block in
//! [`Pool::submit`] while the queue is full.
//!
//! ```no_run
//! use princepdf::job::{Input, Job};
//! use princepdf::pool::Pool;
//! use princepdf_config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Pool::new(&Config::default());
//! pool.start()?;
//! let job = Job::new(Input::from_src("report.html"))
//!     .with_file("report.html", b"<h1>Report</h1>".to_vec());
//! let pdf = pool.submit(job)?;
//! pool.stop()?;
//! # drop(pdf);
//! # Ok(())
//! # }
//! ```

mod ticket;
mod worker;

use std::mem;
use std::sync::atomic::AtomicUsize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender, TrySendError};
use princepdf_config::Config;
use tracing::{debug, info, warn};

use self::ticket::{Claim, Ticket, drain_queue};
use self::worker::{ActiveProcess, Worker, start_session};
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::error::{JobError, PoolError};
use crate::job::Job;
use crate::session::EngineSession;

/// Log target for pool operations.
pub(crate) const POOL_TARGET: &str = "princepdf::pool";

/// Extra time granted to workers beyond the engine grace period at shutdown.
const STOP_MARGIN: Duration = Duration::from_millis(500);

/// Interval between checks while waiting on a full queue or a worker.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Engine session pool.
///
/// `Pool` is `Send + Sync`; share it behind an `Arc` to submit from many
/// threads.
pub struct Pool {
    config: Config,
    diagnostics: Arc<dyn DiagnosticSink>,
    state: Mutex<PoolState>,
}

enum PoolState {
    Idle,
    Starting,
    Running(Running),
    Stopped,
}

struct Running {
    jobs: Sender<Ticket>,
    queue: Receiver<Ticket>,
    workers: Vec<WorkerHandle>,
}

struct WorkerHandle {
    index: usize,
    thread: JoinHandle<()>,
    active: ActiveProcess,
}

impl Pool {
    /// Creates a pool that logs engine diagnostics through `tracing`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_diagnostics(config, Arc::new(TracingDiagnostics::new()))
    }

    /// Creates a pool reporting engine diagnostics to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(config: &Config, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config: config.clone(),
            diagnostics,
            state: Mutex::new(PoolState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Number of sessions the pool runs.
    #[must_use]
    pub const fn sessions(&self) -> usize {
        self.config.pool.sessions
    }

    /// Reports whether the pool is accepting jobs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), PoolState::Running(_))
    }

    /// Starts every session and its worker.
    ///
    /// Sessions are started in order; if one fails, those already running
    /// are ended before the error is returned and the pool stays idle. The
    /// pool is not locked while engines start, so concurrent `submit` calls
    /// fail fast with [`JobError::PoolClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Config`] for an invalid configuration,
    /// [`PoolError::AlreadyStarted`] when called more than once, and
    /// [`PoolError::Spawn`] or [`PoolError::WorkerThread`] when start-up
    /// fails.
    pub fn start(&self) -> Result<(), PoolError> {
        self.config.validate()?;
        {
            let mut state = self.lock();
            if !matches!(*state, PoolState::Idle) {
                return Err(PoolError::AlreadyStarted);
            }
            *state = PoolState::Starting;
        }

        let launched = self.launch();
        let mut state = self.lock();
        match launched {
            Ok(running) => {
                info!(
                    target: POOL_TARGET,
                    sessions = running.workers.len(),
                    queue_capacity = self.config.pool.queue_capacity,
                    "engine pool started"
                );
                *state = PoolState::Running(running);
                Ok(())
            }
            Err(error) => {
                *state = PoolState::Idle;
                Err(error)
            }
        }
    }

    fn launch(&self) -> Result<Running, PoolError> {
        let sessions = self.start_sessions()?;
        let (jobs, queue) = async_channel::bounded(self.config.pool.queue_capacity);
        let live = Arc::new(AtomicUsize::new(sessions.len()));
        let mut workers = Vec::with_capacity(sessions.len());
        for (index, (session, active)) in sessions.into_iter().enumerate() {
            let worker = Worker {
                index,
                engine: self.config.engine.clone(),
                grace: self.config.pool.shutdown_grace(),
                max_restarts: self.config.pool.max_restarts,
                diagnostics: Arc::clone(&self.diagnostics),
                jobs: queue.clone(),
                active: active.clone(),
                live: Arc::clone(&live),
            };
            let spawned = thread::Builder::new()
                .name(format!("princepdf-worker-{index}"))
                .spawn(move || worker.run(session));
            match spawned {
                Ok(thread) => workers.push(WorkerHandle {
                    index,
                    thread,
                    active,
                }),
                Err(source) => {
                    jobs.close();
                    shutdown_workers(workers, self.config.pool.shutdown_grace() + STOP_MARGIN);
                    return Err(PoolError::WorkerThread {
                        index,
                        source: Arc::new(source),
                    });
                }
            }
        }

        Ok(Running {
            jobs,
            queue,
            workers,
        })
    }

    fn start_sessions(&self) -> Result<Vec<(EngineSession, ActiveProcess)>, PoolError> {
        let mut sessions = Vec::with_capacity(self.config.pool.sessions);
        for index in 0..self.config.pool.sessions {
            let active = ActiveProcess::default();
            match start_session(index, &self.config.engine, &self.diagnostics, &active) {
                Ok(session) => sessions.push((session, active)),
                Err(source) => {
                    warn!(
                        target: POOL_TARGET,
                        session = index,
                        error = %source,
                        "engine session failed to start, ending started sessions"
                    );
                    for (mut started, _) in sessions {
                        started.end(self.config.pool.shutdown_grace());
                    }
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }
        Ok(sessions)
    }

    /// Renders `job`, waiting at most the configured submit timeout.
    ///
    /// Without a configured timeout the call blocks until a session answers.
    ///
    /// # Errors
    ///
    /// Returns the job's [`JobError`]; see [`Pool::submit_with_timeout`].
    pub fn submit(&self, job: Job) -> Result<Vec<u8>, JobError> {
        self.dispatch(job, self.config.pool.submit_timeout())
    }

    /// Renders `job`, giving up after `timeout`.
    ///
    /// The deadline covers both waiting for queue space and waiting for the
    /// result. A job abandoned after a session claimed it has that session's
    /// engine killed; the worker replaces it before serving the next job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Timeout`] when the deadline passes,
    /// [`JobError::PoolClosed`] when the pool is not running,
    /// [`JobError::UnexpectedResponse`] when the engine answers without a
    /// document, and any failure reported by the serving session.
    pub fn submit_with_timeout(&self, job: Job, timeout: Duration) -> Result<Vec<u8>, JobError> {
        self.dispatch(job, Some(timeout))
    }

    fn dispatch(&self, job: Job, timeout: Option<Duration>) -> Result<Vec<u8>, JobError> {
        let jobs = match &*self.lock() {
            PoolState::Running(running) => running.jobs.clone(),
            PoolState::Idle | PoolState::Starting | PoolState::Stopped => {
                return Err(JobError::PoolClosed);
            }
        };

        let claim = Arc::new(Claim::default());
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let ticket = Ticket::new(job, timeout, Arc::clone(&claim), reply_tx);
        let deadline = timeout.map(|limit| (limit, Instant::now() + limit));

        match deadline {
            None => jobs
                .send_blocking(ticket)
                .map_err(|_| JobError::PoolClosed)?,
            Some((limit, at)) => enqueue_before(&jobs, ticket, at, limit)?,
        }
        // A waiting caller must not keep the queue open.
        drop(jobs);

        let reply = match deadline {
            None => reply_rx.recv().map_err(|_| JobError::PoolClosed)?,
            Some((limit, at)) => {
                match reply_rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                    Ok(reply) => reply,
                    Err(RecvTimeoutError::Timeout) => {
                        abandon(&claim);
                        return Err(JobError::timeout(limit));
                    }
                    Err(RecvTimeoutError::Disconnected) => return Err(JobError::PoolClosed),
                }
            }
        };

        let output = reply?;
        let kind = output.kind.to_string();
        output
            .into_document()
            .ok_or(JobError::UnexpectedResponse { kind })
    }

    /// Stops the pool.
    ///
    /// The queue is closed; jobs already queued are still served. Each
    /// worker then ends its session, granting the engine the configured
    /// grace period. Workers still busy after that are unblocked by killing
    /// their engine. The call never waits indefinitely; a worker that still
    /// fails to finish is detached and logged.
    ///
    /// Jobs still queued once the workers are gone are answered with
    /// [`JobError::PoolClosed`]. Stopping an already stopped pool succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotStarted`] if the pool was never started or is
    /// still starting.
    pub fn stop(&self) -> Result<(), PoolError> {
        let running = {
            let mut state = self.lock();
            match mem::replace(&mut *state, PoolState::Stopped) {
                PoolState::Running(running) => running,
                PoolState::Stopped => return Ok(()),
                previous @ (PoolState::Idle | PoolState::Starting) => {
                    *state = previous;
                    return Err(PoolError::NotStarted);
                }
            }
        };

        info!(target: POOL_TARGET, "stopping engine pool");
        running.jobs.close();
        shutdown_workers(
            running.workers,
            self.config.pool.shutdown_grace() + STOP_MARGIN,
        );
        let drained = drain_queue(&running.queue, || JobError::PoolClosed);
        info!(target: POOL_TARGET, drained, "engine pool stopped");
        Ok(())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.is_running()
            && let Err(error) = self.stop()
        {
            debug!(target: POOL_TARGET, error = %error, "failed to stop pool on drop");
        }
    }
}

fn enqueue_before(
    jobs: &Sender<Ticket>,
    ticket: Ticket,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), JobError> {
    let mut pending = ticket;
    loop {
        match jobs.try_send(pending) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(JobError::PoolClosed),
            Err(TrySendError::Full(returned)) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(JobError::timeout(timeout));
                }
                pending = returned;
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
        }
    }
}

fn abandon(claim: &Claim) {
    if let Some(process) = claim.abandon() {
        warn!(
            target: POOL_TARGET,
            session = process.session(),
            pid = process.pid(),
            "job deadline passed, killing engine"
        );
        process.kill();
    }
}

/// Waits for workers until `budget` elapses, kills the engines of those
/// still running, then waits once more before detaching stragglers.
fn shutdown_workers(workers: Vec<WorkerHandle>, budget: Duration) {
    let pending = wait_for_workers(workers, Instant::now() + budget);
    for worker in &pending {
        warn!(
            target: POOL_TARGET,
            worker = worker.index,
            "worker did not stop in time, killing its engine"
        );
        worker.active.kill();
    }
    for worker in wait_for_workers(pending, Instant::now() + budget) {
        warn!(
            target: POOL_TARGET,
            worker = worker.index,
            "worker still running after its engine was killed, detaching"
        );
    }
}

/// Joins every worker that finishes before `deadline`, returning the rest.
fn wait_for_workers(mut workers: Vec<WorkerHandle>, deadline: Instant) -> Vec<WorkerHandle> {
    loop {
        let (finished, pending): (Vec<_>, Vec<_>) = workers
            .into_iter()
            .partition(|worker| worker.thread.is_finished());
        for worker in finished {
            if worker.thread.join().is_err() {
                warn!(target: POOL_TARGET, worker = worker.index, "worker thread panicked");
            }
        }
        if pending.is_empty() || Instant::now() >= deadline {
            return pending;
        }
        workers = pending;
        thread::sleep(POLL_INTERVAL);
    }
}
