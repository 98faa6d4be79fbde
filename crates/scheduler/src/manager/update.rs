use std::iter;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::sync::lock;
use crate::task::Job;

use super::core::TaskManager;

impl TaskManager {
    /// Run up to `max_callbacks` deferred handlers, highest priority first,
    /// on the calling thread. Returns how many were run.
    ///
    /// The first call binds the designated thread; calls from any other
    /// thread are refused and return 0 until the manager is destroyed.
    pub fn update(&self) -> usize {
        if !self.on_designated_thread() {
            warn!(thread = ?thread::current().id(), "update called off the designated thread");
            return 0;
        }

        let limit = self.max_callbacks.load(Ordering::Relaxed);
        // Popped under the lock, run outside it so handlers may submit.
        let batch: Vec<Arc<dyn Job>> = {
            let mut queues = lock(&self.shared.queues);
            iter::from_fn(|| queues.deferred.pop()).take(limit).collect()
        };

        for job in &batch {
            let outcome = job.complete_deferred(&self.shared.counters);
            debug!(task = job.id(), ?outcome, "deferred handler ran");
        }
        self.shared.counters.record_drained(batch.len());
        batch.len()
    }

    fn on_designated_thread(&self) -> bool {
        let current = thread::current().id();
        let mut designated = lock(&self.designated);
        *designated.get_or_insert(current) == current
    }
}
