use std::time::Duration;

use thiserror::Error;

use crate::market_api::errors::VerificationApiError;

/// Failure of a single task run. The scheduler reports it and carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Storage error: {0}")]
    Store(String),
    #[error("{0}")]
    Other(String),
}

impl From<VerificationApiError> for JobError {
    fn from(e: VerificationApiError) -> Self {
        Self::Store(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Shutdown did not complete within {0:?}. {1} task run(s) were still in flight")]
    ShutdownTimeout(Duration, usize),
    #[error("A scheduler task panicked. {0}")]
    Panicked(String),
}
