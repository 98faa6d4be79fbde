//! Task manager -- owns the worker pool, the organizer and both queues.
//!
//! Split into focused submodules:
//! - `core`: TaskManager struct, lifecycle, task creation and tuning
//! - `organizer`: the thread that routes tasks between queues and worker slots
//! - `submission`: validating and queueing tasks
//! - `update`: draining deferred handlers on the designated thread

mod core;
mod organizer;
mod submission;
mod update;

pub use self::core::TaskManager;
