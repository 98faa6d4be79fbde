use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sync::lock;
use crate::task::Outcome;

/// Point-in-time view of a task manager's activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Worker threads in the current pool (0 when not created).
    pub workers: usize,
    /// Workers currently executing a body or inline handler.
    pub busy_workers: usize,
    /// Accepted submissions, resubmissions included.
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Deferred handlers run by `update`, whatever their outcome.
    pub callbacks_drained: u64,
    /// Tasks waiting for a worker.
    pub pending: usize,
    /// Tasks waiting for `update` to run their handler.
    pub deferred: usize,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Submissions that have not yet reached `Completed` or `Error`.
    pub fn outstanding(&self) -> u64 {
        self.tasks_submitted
            .saturating_sub(self.tasks_completed + self.tasks_failed)
    }

    /// Fraction of workers that are busy (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        if self.workers == 0 {
            0.0
        } else {
            self.busy_workers as f64 / self.workers as f64
        }
    }
}

/// Live counters shared by the manager, its organizer and its workers.
#[derive(Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    drained: AtomicU64,
    busy_workers: AtomicUsize,
    last_completed_at: Mutex<Option<DateTime<Utc>>>,
}

impl Counters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self, count: usize) {
        self.drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                *lock(&self.last_completed_at) = Some(Utc::now());
            }
            Outcome::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Deferred => {}
        }
    }

    pub(crate) fn worker_busy(&self) {
        self.busy_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_idle(&self) {
        self.busy_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        workers: usize,
        pending: usize,
        deferred: usize,
    ) -> SchedulerMetrics {
        SchedulerMetrics {
            workers,
            busy_workers: self.busy_workers.load(Ordering::Relaxed),
            tasks_submitted: self.submitted.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_failed: self.failed.load(Ordering::Relaxed),
            callbacks_drained: self.drained.load(Ordering::Relaxed),
            pending,
            deferred,
            last_completed_at: *lock(&self.last_completed_at),
        }
    }
}
