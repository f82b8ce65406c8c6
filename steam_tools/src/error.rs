use thiserror::Error;

#[derive(Debug, Error)]
pub enum SteamApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The inventory of this profile is private")]
    PrivateInventory,
    #[error("Steam rejected the inventory request: {0}")]
    InventoryError(String),
    #[error("Not a recognisable Steam profile reference: {0}")]
    InvalidProfileReference(String),
    #[error("No Steam profile matches {0}")]
    ProfileNotFound(String),
    #[error("A Steam web API key is required for {0}")]
    MissingApiKey(&'static str),
}

impl SteamApiError {
    pub fn is_private(&self) -> bool {
        matches!(self, Self::PrivateInventory)
    }
}
