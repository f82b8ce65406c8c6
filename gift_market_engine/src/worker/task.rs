use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::worker::errors::JobError;

/// A unit of recurring background work.
///
/// The scheduler never runs two instances of the same task at once, so implementations can keep their work strictly
/// sequential.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    fn display_name(&self) -> String;

    /// Rest period between the end of one run and the start of the next. `Duration::ZERO` means run once.
    fn interval(&self) -> Duration;

    async fn run(&self, ctx: &TaskContext) -> Result<(), JobError>;
}

/// Handed to every task run. A run that starts while shutdown is pending still goes to completion, and the scheduler
/// stops requeueing the task once it returns. [`TaskContext::is_shutting_down`] is for reporting, not for bailing out.
#[derive(Debug, Clone)]
pub struct TaskContext {
    shutdown: watch::Receiver<bool>,
}

impl TaskContext {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown }
    }

    /// A context that never signals shutdown. Handy for running a task by hand.
    pub fn detached() -> Self {
        let (tx, rx) = watch::channel(false);
        // Keeps the value readable after the sender is gone.
        drop(tx);
        Self { shutdown: rx }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
