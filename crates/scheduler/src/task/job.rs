use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{Priority, TaskId, TaskStatus};
use crate::metrics::Counters;

const UNKNOWN_PANIC: &str = "task panicked without providing any information about the cause";

/// How a single execution step left the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed,
    /// Body finished, handler parked for the caller thread.
    Deferred,
    Failed,
}

/// Type-erased view of a task, as seen by queues, workers and the organizer.
pub(crate) trait Job: Send + Sync {
    fn id(&self) -> TaskId;

    fn status(&self) -> TaskStatus;

    fn priority(&self) -> Priority;

    /// Run the body and, unless deferred, the handler. Called on a worker thread.
    /// A terminal outcome is recorded in `counters` before the status is published.
    fn execute(&self, counters: &Counters) -> Outcome;

    /// Run a deferred handler. Called from `TaskManager::update`.
    fn complete_deferred(&self, counters: &Counters) -> Outcome;
}

/// Run user code, turning both error returns and panics into a message.
pub(crate) fn capture<R>(f: impl FnOnce() -> anyhow::Result<R>) -> Result<R, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("task panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("task panicked: {msg}")
    } else {
        UNKNOWN_PANIC.to_string()
    }
}
