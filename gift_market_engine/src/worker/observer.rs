use std::time::Duration;

use log::*;

use crate::worker::errors::JobError;

/// Receives the life cycle notifications of scheduled tasks.
pub trait SchedulerObserver: Send + Sync {
    fn task_started(&self, _name: &str) {}

    fn task_succeeded(&self, _name: &str, _elapsed: Duration) {}

    fn task_failed(&self, name: &str, error: &JobError);

    /// The task will not be scheduled again.
    fn task_retired(&self, _name: &str) {}
}

/// Reports through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SchedulerObserver for LogObserver {
    fn task_started(&self, name: &str) {
        debug!("👷️ {name} started");
    }

    fn task_succeeded(&self, name: &str, elapsed: Duration) {
        info!("👷️ {name} completed in {elapsed:.2?}");
    }

    fn task_failed(&self, name: &str, error: &JobError) {
        error!("👷️ {name} failed. {error}");
    }

    fn task_retired(&self, name: &str) {
        debug!("👷️ {name} retired");
    }
}
