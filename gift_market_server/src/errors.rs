use gift_market_engine::{traits::StoreError, worker::SchedulerError};
use steam_tools::SteamApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize the daemon. {0}")]
    InitializeError(String),
    #[error("Invalid daemon configuration. {0}")]
    ConfigurationError(String),
    #[error("An error occurred on the backend of the daemon. {0}")]
    BackendError(#[from] StoreError),
    #[error("Could not set up the Steam client. {0}")]
    SteamError(#[from] SteamApiError),
    #[error("The job scheduler did not stop cleanly. {0}")]
    SchedulerError(#[from] SchedulerError),
    #[error("An I/O error happened in the daemon. {0}")]
    IOError(#[from] std::io::Error),
}
