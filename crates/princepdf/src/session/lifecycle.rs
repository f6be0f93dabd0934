//! Engine process termination.

use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::SESSION_TARGET;

/// Interval between exit checks while waiting out a grace period.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared handle to a running engine process.
///
/// The handle outlives borrows of the owning session, so another thread can
/// kill an engine that is stuck mid-job.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    session: usize,
    pid: u32,
    child: Arc<Mutex<Child>>,
}

impl ProcessHandle {
    pub(super) fn new(session: usize, child: Child) -> Self {
        Self {
            session,
            pid: child.id(),
            child: Arc::new(Mutex::new(child)),
        }
    }

    /// Session the process belongs to.
    #[must_use]
    pub const fn session(&self) -> usize {
        self.session
    }

    /// Operating system process identifier.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Reports whether the process has exited, reaping it if so.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        match self.lock().try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    session = self.session,
                    error = %error,
                    "failed to check engine status"
                );
                false
            }
        }
    }

    /// Kills the process and reaps it.
    pub fn kill(&self) {
        let mut child = self.lock();
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        if let Err(error) = child.kill() {
            warn!(
                target: SESSION_TARGET,
                session = self.session,
                pid = self.pid,
                error = %error,
                "failed to kill engine"
            );
            return;
        }
        match child.wait() {
            Ok(status) => debug!(
                target: SESSION_TARGET,
                session = self.session,
                pid = self.pid,
                ?status,
                "engine killed"
            ),
            Err(error) => warn!(
                target: SESSION_TARGET,
                session = self.session,
                pid = self.pid,
                error = %error,
                "failed to reap killed engine"
            ),
        }
    }

    /// Arms a timer that kills the process once `timeout` elapses.
    ///
    /// Returns `None`, leaving the process unbounded, if the timer thread
    /// cannot be started.
    pub(super) fn kill_after(&self, timeout: Duration) -> Option<KillTimer> {
        let (disarm, armed) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let process = self.clone();
        let flag = Arc::clone(&fired);
        let spawned = thread::Builder::new()
            .name(format!("princepdf-timer-{}", self.session))
            .spawn(move || {
                if matches!(armed.recv_timeout(timeout), Err(RecvTimeoutError::Timeout)) {
                    flag.store(true, Ordering::Release);
                    process.kill();
                }
            });
        match spawned {
            Ok(thread) => Some(KillTimer {
                disarm,
                fired,
                thread,
            }),
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    session = self.session,
                    error = %error,
                    "failed to start engine timer"
                );
                None
            }
        }
    }

    /// Waits up to `grace` for the process to exit on its own, then kills it.
    ///
    /// Returns `true` when the process exited within the grace period.
    #[must_use = "a `false` result means the engine had to be killed"]
    pub fn terminate(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if self.has_exited() {
                debug!(
                    target: SESSION_TARGET,
                    session = self.session,
                    pid = self.pid,
                    "engine exited"
                );
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }

        warn!(
            target: SESSION_TARGET,
            session = self.session,
            pid = self.pid,
            grace_ms = grace.as_millis(),
            "engine did not exit within grace period, killing"
        );
        self.kill();
        false
    }
}

/// Pending kill armed by [`ProcessHandle::kill_after`].
pub(super) struct KillTimer {
    disarm: Sender<()>,
    fired: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl KillTimer {
    /// Cancels the timer, reporting whether it had already killed the process.
    pub(super) fn disarm(self) -> bool {
        drop(self.disarm);
        // After the join the flag can no longer change.
        let _ = self.thread.join();
        self.fired.load(Ordering::Acquire)
    }
}
