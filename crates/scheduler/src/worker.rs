//! Worker threads and their single-task slots.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::metrics::Counters;
use crate::sync::lock;
use crate::task::{Job, Outcome, TaskStatus};

/// A task handed to a worker, plus what happened when the worker ran it.
pub(crate) struct Assignment {
    pub(crate) job: Arc<dyn Job>,
    /// Set by the worker after execution. The organizer reads this rather
    /// than the live status, which a caller may already have moved on by
    /// resubmitting the task.
    pub(crate) outcome: Option<Outcome>,
}

impl Assignment {
    pub(crate) fn new(job: Arc<dyn Job>) -> Self {
        Self { job, outcome: None }
    }

    fn is_ready(&self) -> bool {
        self.outcome.is_none() && self.job.status() == TaskStatus::Pending
    }
}

pub(crate) type Slot = Arc<Mutex<Option<Assignment>>>;

/// Idle behaviour of pool threads, captured when the pool is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IdlePolicy {
    /// How long after its last task a worker keeps yielding instead of sleeping.
    pub(crate) inactive_timeout: Duration,
    pub(crate) sleep_length: Duration,
}

impl IdlePolicy {
    pub(crate) fn idle(&self, since_last_work: Duration) {
        if since_last_work < self.inactive_timeout {
            thread::yield_now();
        } else {
            thread::sleep(self.sleep_length);
        }
    }
}

/// One execution thread with a slot the organizer fills.
pub(crate) struct Worker {
    index: usize,
    slot: Slot,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(
        index: usize,
        policy: IdlePolicy,
        counters: Arc<Counters>,
    ) -> io::Result<Self> {
        let slot: Slot = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let thread = thread::Builder::new()
            .name(format!("taskhive-worker-{index}"))
            .spawn({
                let slot = Arc::clone(&slot);
                let running = Arc::clone(&running);
                move || work_loop(index, &slot, &running, policy, &counters)
            })?;

        Ok(Self {
            index,
            slot,
            running,
            thread: Some(thread),
        })
    }

    pub(crate) fn slot(&self) -> Slot {
        Arc::clone(&self.slot)
    }

    /// Signal the thread to exit and wait for it. Idempotent.
    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(worker = self.index, "worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn work_loop(
    index: usize,
    slot: &Mutex<Option<Assignment>>,
    running: &AtomicBool,
    policy: IdlePolicy,
    counters: &Counters,
) {
    debug!(worker = index, "worker started");
    let mut last_work = Instant::now();

    while running.load(Ordering::Acquire) {
        let mut guard = lock(slot);
        if !guard.as_ref().is_some_and(Assignment::is_ready) {
            drop(guard);
            policy.idle(last_work.elapsed());
            continue;
        }
        let Some(assignment) = guard.as_mut() else {
            continue;
        };

        last_work = Instant::now();
        counters.worker_busy();
        let outcome = assignment.job.execute(counters);
        counters.worker_idle();
        debug!(worker = index, task = assignment.job.id(), ?outcome, "task executed");
        assignment.outcome = Some(outcome);
    }

    debug!(worker = index, "worker stopped");
}
