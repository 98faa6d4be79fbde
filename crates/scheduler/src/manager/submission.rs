use std::sync::atomic::Ordering;

use tracing::debug;

use crate::error::SubmitError;
use crate::sync::lock;
use crate::task::Task;

use super::core::TaskManager;

impl TaskManager {
    /// Lock `task` and queue it for execution.
    ///
    /// Accepted from `Setup`, `Completed` or `Error`; a resubmitted task keeps
    /// its id and loses its previous error. A refused task is left untouched.
    pub fn submit<T: Send + 'static>(&self, task: &Task<T>) -> Result<(), SubmitError> {
        let mut queues = lock(&self.shared.queues);
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(SubmitError::NotRunning);
        }
        task.lock_for_submit()?;
        queues.pending.push(task.as_job());
        drop(queues);

        self.shared.counters.record_submitted();
        debug!(task = task.id(), priority = %task.priority(), "task submitted");
        Ok(())
    }
}
