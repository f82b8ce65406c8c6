//! A small scheduler for recurring background tasks.
//!
//! Each [`Task`] runs once at startup and then on its own interval, measured from the end of its previous run, so a
//! task never overlaps itself. Failures go to a [`SchedulerObserver`] and never stop the scheduler. Shutdown wakes
//! resting tasks and waits, for a bounded time, for running ones.
mod errors;
mod observer;
mod scheduler;
mod task;

pub use errors::{JobError, SchedulerError};
pub use observer::{LogObserver, SchedulerObserver};
pub use scheduler::{Scheduler, SchedulerHandle, DEFAULT_SHUTDOWN_TIMEOUT};
pub use task::{Task, TaskContext};
