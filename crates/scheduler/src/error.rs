use std::io;

use thiserror::Error;

use crate::task::TaskStatus;

/// Errors raised while bringing a [`TaskManager`](crate::TaskManager) pool up.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task manager is already created")]
    AlreadyCreated,

    #[error("task manager needs at least one worker")]
    ZeroWorkers,

    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: String,
        #[source]
        source: io::Error,
    },
}

/// Reasons a task was refused by [`TaskManager::submit`](crate::TaskManager::submit).
///
/// A refused task is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("task manager is not running")]
    NotRunning,

    #[error("task cannot be submitted while {0}")]
    InvalidState(TaskStatus),

    #[error("task has no body configured")]
    MissingBody,
}

/// Errors from loading or validating a [`SchedulerConfig`](crate::SchedulerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
