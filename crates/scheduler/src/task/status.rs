use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// ```text
/// Setup ──► Pending ──► InProgress ──┬──► Completed
///              ▲                     ├──► CallbackOnUpdate ──┬──► Completed
///              │                     │                       └──► Error
///              │                     └──► Error
///              └────────── resubmit (Completed / Error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The body or handler failed; see [`Task::error`](crate::Task::error).
    Error,
    /// Freshly created and editable.
    Setup,
    /// Queued, waiting for a worker.
    Pending,
    /// Claimed by a worker; the body is running.
    InProgress,
    /// Body finished; the handler waits for [`TaskManager::update`](crate::TaskManager::update).
    CallbackOnUpdate,
    /// Body and handler finished successfully.
    Completed,
}

impl TaskStatus {
    /// `Completed` or `Error`.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether [`TaskManager::submit`](crate::TaskManager::submit) accepts a task in this state.
    pub fn is_submittable(self) -> bool {
        matches!(self, Self::Setup | Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Setup => "setup",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::CallbackOnUpdate => "callback_on_update",
            Self::Completed => "completed",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Setup => 1,
            Self::Pending => 2,
            Self::InProgress => 3,
            Self::CallbackOnUpdate => 4,
            Self::Completed => 5,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Setup,
            2 => Self::Pending,
            3 => Self::InProgress,
            4 => Self::CallbackOnUpdate,
            5 => Self::Completed,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status cell shared between the caller, the organizer and a worker.
pub(crate) struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    pub(crate) fn new(status: TaskStatus) -> Self {
        Self(AtomicU8::new(status.to_u8()))
    }

    pub(crate) fn load(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, status: TaskStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }
}
