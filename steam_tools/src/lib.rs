//! Thin client for the parts of the Steam web APIs the gift market needs: public inventories and profile lookups.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::SteamApi;
pub use config::SteamConfig;
pub use data_objects::{InventoryAsset, RawInventory};
pub use error::SteamApiError;
pub use helpers::ProfileReference;
