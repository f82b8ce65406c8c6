//! Connects the engine to Steam.
//!
//! [`SteamInventory`] reads public inventories for the verification jobs and turns profile URLs and vanity names into
//! canonical Steam ids for the market.
use async_trait::async_trait;
use gift_market_engine::{
    verification::{Asset, InventoryError, InventorySource},
    ProfileResolutionError,
    ProfileResolver,
};
use log::*;
use steam_tools::{InventoryAsset, SteamApi, SteamApiError, SteamConfig};

#[derive(Clone)]
pub struct SteamInventory {
    api: SteamApi,
}

impl SteamInventory {
    pub fn new(config: SteamConfig) -> Result<Self, SteamApiError> {
        let api = SteamApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &SteamApi {
        &self.api
    }
}

#[async_trait]
impl InventorySource for SteamInventory {
    async fn fetch_inventory(&self, profile_id: &str) -> Result<Vec<Asset>, InventoryError> {
        match self.api.inventory(profile_id).await {
            Ok(assets) => Ok(assets.into_iter().map(asset_from_inventory).collect()),
            Err(e) if e.is_private() => Err(InventoryError::Private),
            Err(e) => {
                debug!("🔍️ Could not read the Steam inventory of {profile_id}. {e}");
                Err(InventoryError::Fetch(e.to_string()))
            },
        }
    }
}

#[async_trait]
impl ProfileResolver for SteamInventory {
    async fn resolve_profile_id(&self, reference: &str) -> Result<String, ProfileResolutionError> {
        self.api.resolve_profile(reference.trim()).await.map_err(|e| ProfileResolutionError(e.to_string()))
    }
}

/// Keeps the fields that verification compares, and files the item type and hero under the tags.
///
/// A gift counts as opened once Steam shows the date it was received. Items that were never gifted are always opened.
pub fn asset_from_inventory(asset: InventoryAsset) -> Asset {
    let gift_opened = asset.gift_from.is_empty() || !asset.date_received.is_empty();
    let tags = [asset.item_type, asset.hero].into_iter().filter(|t| !t.is_empty()).collect();
    Asset {
        name: asset.name,
        gifter: asset.gift_from,
        date_received: asset.date_received,
        dedication: asset.dedication,
        tags,
        gift_opened,
    }
}
