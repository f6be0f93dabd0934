//! Queued jobs and the hand-off between callers and workers.

use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_channel::Receiver;
use tracing::debug;

use super::POOL_TARGET;
use crate::error::JobError;
use crate::job::Job;
use crate::protocol::Output;
use crate::session::ProcessHandle;

/// Reply delivered to a waiting caller.
pub(crate) type Reply = Result<Output, JobError>;

/// A job travelling through the queue with its reply channel.
pub(crate) struct Ticket {
    pub(crate) job: Job,
    pub(crate) claim: Arc<Claim>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    reply: SyncSender<Reply>,
}

impl Ticket {
    pub(crate) fn new(
        job: Job,
        timeout: Option<Duration>,
        claim: Arc<Claim>,
        reply: SyncSender<Reply>,
    ) -> Self {
        Self {
            job,
            claim,
            timeout,
            deadline: timeout.map(|limit| Instant::now() + limit),
            reply,
        }
    }

    /// Reports whether the caller has stopped waiting for this job.
    pub(crate) fn is_expired(&self) -> bool {
        self.claim.is_abandoned()
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(crate) fn timeout_error(&self) -> JobError {
        JobError::timeout(self.timeout.unwrap_or_default())
    }

    /// Sends the outcome to the caller, if it is still listening.
    pub(crate) fn respond(self, reply: Reply) {
        if self.reply.try_send(reply).is_err() {
            debug!(target: POOL_TARGET, "caller stopped waiting; reply dropped");
        }
    }
}

/// Answers every ticket still queued with `error`, returning how many there
/// were.
pub(crate) fn drain_queue(jobs: &Receiver<Ticket>, error: impl Fn() -> JobError) -> usize {
    let mut drained = 0;
    while let Ok(ticket) = jobs.try_recv() {
        ticket.respond(Err(error()));
        drained += 1;
    }
    drained
}

#[derive(Debug, Default)]
struct ClaimState {
    abandoned: bool,
    process: Option<ProcessHandle>,
}

/// Shared record of which engine, if any, is working on a job.
///
/// The caller abandons a job when its deadline passes; if an engine has
/// claimed the job by then, that engine is handed back so it can be killed.
#[derive(Debug, Default)]
pub(crate) struct Claim {
    state: Mutex<ClaimState>,
}

impl Claim {
    fn lock(&self) -> MutexGuard<'_, ClaimState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Records the engine running the job. Returns `false` if the job was
    /// already abandoned.
    pub(crate) fn attach(&self, process: ProcessHandle) -> bool {
        let mut state = self.lock();
        if state.abandoned {
            return false;
        }
        state.process = Some(process);
        true
    }

    /// Clears the engine once the job has finished.
    pub(crate) fn detach(&self) {
        self.lock().process = None;
    }

    /// Marks the job abandoned, returning the engine that must be stopped.
    pub(crate) fn abandon(&self) -> Option<ProcessHandle> {
        let mut state = self.lock();
        state.abandoned = true;
        state.process.take()
    }

    pub(crate) fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }
}
