use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::job::{capture, Job, Outcome};
use super::status::AtomicStatus;
use super::{Priority, TaskStatus};
use crate::error::SubmitError;
use crate::metrics::Counters;
use crate::sync::lock;

/// Identifier stamped on a task at creation. Never reused by a manager.
pub type TaskId = u64;

type Body<T> = Box<dyn FnMut() -> anyhow::Result<T> + Send>;
type Handler<T> = Box<dyn FnMut(&T) -> anyhow::Result<()> + Send>;

struct TaskInner<T> {
    id: TaskId,
    status: AtomicStatus,
    locked: AtomicBool,
    priority: AtomicU32,
    callback_on_update: AtomicBool,
    /// Serializes configuration writes against the submit transition.
    edit: Mutex<()>,
    body: Mutex<Option<Body<T>>>,
    handler: Mutex<Option<Handler<T>>>,
    /// Holds the body's output only while a deferred handler is waiting.
    result: Mutex<Option<T>>,
    error: Mutex<Option<String>>,
}

/// Shared handle to a unit of work producing a `T`.
///
/// `Task<()>` is the no-result form. Clones refer to the same task. The
/// body, handler, priority and `callback_on_update` flag can only be changed
/// while the task is unlocked; writes to a locked task are ignored and the
/// setter returns `false`.
pub struct Task<T> {
    inner: Arc<TaskInner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status.load())
            .field("priority", &Priority::new(self.inner.priority.load(Ordering::Relaxed)))
            .field("locked", &self.inner.locked.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id,
                status: AtomicStatus::new(TaskStatus::Setup),
                locked: AtomicBool::new(false),
                priority: AtomicU32::new(Priority::LOW.value()),
                callback_on_update: AtomicBool::new(false),
                edit: Mutex::new(()),
                body: Mutex::new(None),
                handler: Mutex::new(None),
                result: Mutex::new(None),
                error: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.status.load()
    }

    pub fn priority(&self) -> Priority {
        Priority::new(self.inner.priority.load(Ordering::Acquire))
    }

    /// When `true`, the handler runs inside `TaskManager::update` instead of on the worker.
    pub fn callback_on_update(&self) -> bool {
        self.inner.callback_on_update.load(Ordering::Acquire)
    }

    /// `true` from submission until the task completes or fails.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }

    /// Message captured from the last failure. Only set while the status is `Error`.
    pub fn error(&self) -> Option<String> {
        lock(&self.inner.error).clone()
    }

    pub fn has_handler(&self) -> bool {
        lock(&self.inner.handler).is_some()
    }

    pub fn set_body<F>(&self, body: F) -> bool
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
    {
        self.edit(|inner| *lock(&inner.body) = Some(Box::new(body)))
    }

    pub fn set_handler<F>(&self, handler: F) -> bool
    where
        F: FnMut(&T) -> anyhow::Result<()> + Send + 'static,
    {
        self.edit(|inner| *lock(&inner.handler) = Some(Box::new(handler)))
    }

    pub fn clear_handler(&self) -> bool {
        self.edit(|inner| *lock(&inner.handler) = None)
    }

    pub fn set_priority(&self, priority: impl Into<Priority>) -> bool {
        let priority = priority.into();
        self.edit(|inner| inner.priority.store(priority.value(), Ordering::Release))
    }

    pub fn set_callback_on_update(&self, deferred: bool) -> bool {
        self.edit(|inner| inner.callback_on_update.store(deferred, Ordering::Release))
    }

    fn edit(&self, apply: impl FnOnce(&TaskInner<T>)) -> bool {
        let _guard = lock(&self.inner.edit);
        if self.is_locked() {
            return false;
        }
        apply(&self.inner);
        true
    }

    /// Validate and lock the task for queueing. Leaves it untouched on error.
    pub(crate) fn lock_for_submit(&self) -> Result<(), SubmitError> {
        let _guard = lock(&self.inner.edit);
        let status = self.status();
        if !status.is_submittable() || self.is_locked() {
            return Err(SubmitError::InvalidState(status));
        }
        if lock(&self.inner.body).is_none() {
            return Err(SubmitError::MissingBody);
        }
        self.inner.locked.store(true, Ordering::Release);
        *lock(&self.inner.error) = None;
        self.inner.status.store(TaskStatus::Pending);
        Ok(())
    }

    pub(crate) fn as_job(&self) -> Arc<dyn Job> {
        Arc::clone(&self.inner) as Arc<dyn Job>
    }
}

impl<T: Send + 'static> TaskInner<T> {
    fn run_body(&self) -> Result<T, String> {
        // Taken out so status readers never wait on user code; the task is
        // locked, so no setter can install a replacement meanwhile.
        let mut body = lock(&self.body).take();
        let outcome = match body.as_mut() {
            Some(body) => capture(|| body()),
            None => Err("task has no body".to_string()),
        };
        *lock(&self.body) = body;
        outcome
    }

    fn run_handler(&self, value: &T) -> Result<(), String> {
        let mut handler = lock(&self.handler).take();
        let outcome = match handler.as_mut() {
            Some(handler) => capture(|| handler(value)),
            None => Ok(()),
        };
        *lock(&self.handler) = handler;
        outcome
    }

    fn finish(&self, counters: &Counters) -> Outcome {
        counters.record(Outcome::Completed);
        self.locked.store(false, Ordering::Release);
        self.status.store(TaskStatus::Completed);
        Outcome::Completed
    }

    fn fail(&self, message: String, counters: &Counters) -> Outcome {
        warn!(task = self.id, error = %message, "task failed");
        *lock(&self.error) = Some(message);
        counters.record(Outcome::Failed);
        self.locked.store(false, Ordering::Release);
        self.status.store(TaskStatus::Error);
        Outcome::Failed
    }
}

impl<T: Send + 'static> Job for TaskInner<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn status(&self) -> TaskStatus {
        self.status.load()
    }

    fn priority(&self) -> Priority {
        Priority::new(self.priority.load(Ordering::Acquire))
    }

    fn execute(&self, counters: &Counters) -> Outcome {
        self.status.store(TaskStatus::InProgress);
        let value = match self.run_body() {
            Ok(value) => value,
            Err(message) => return self.fail(message, counters),
        };

        if self.callback_on_update.load(Ordering::Acquire) {
            *lock(&self.result) = Some(value);
            self.status.store(TaskStatus::CallbackOnUpdate);
            return Outcome::Deferred;
        }

        let handled = self.run_handler(&value);
        drop(value);
        match handled {
            Ok(()) => self.finish(counters),
            Err(message) => self.fail(message, counters),
        }
    }

    fn complete_deferred(&self, counters: &Counters) -> Outcome {
        let value = lock(&self.result).take();
        let handled = match value.as_ref() {
            Some(value) => self.run_handler(value),
            None => Ok(()),
        };
        drop(value);
        match handled {
            Ok(()) => self.finish(counters),
            Err(message) => self.fail(message, counters),
        }
    }
}
