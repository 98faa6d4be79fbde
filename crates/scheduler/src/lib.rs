//! Thread-pool task scheduler with deferred, caller-thread completion handlers.
//!
//! Tasks are created by a [`TaskManager`], configured while unlocked, then
//! submitted. An organizer thread hands pending tasks to worker threads in
//! priority order; handlers either run inline on the worker or are parked
//! until the owner calls [`TaskManager::update`].

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
mod queue;
mod sync;
pub mod task;
mod worker;

pub use config::{load_dotenv, SchedulerConfig};
pub use error::{ConfigError, SchedulerError, SubmitError};
pub use manager::TaskManager;
pub use metrics::SchedulerMetrics;
pub use task::{Priority, Task, TaskId, TaskStatus};
