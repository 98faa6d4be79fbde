//! Task handles and the per-task state machine.

mod handle;
mod job;
mod priority;
mod status;

pub use handle::{Task, TaskId};
pub use priority::Priority;
pub use status::TaskStatus;

pub(crate) use job::{Job, Outcome};
