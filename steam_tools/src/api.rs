use std::sync::Arc;

use log::*;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::SteamConfig,
    data_objects::{InventoryAsset, RawInventory},
    helpers::{parse_profile_reference, ProfileReference},
    SteamApiError,
};

#[derive(Clone)]
pub struct SteamApi {
    config: SteamConfig,
    client: Arc<Client>,
}

impl SteamApi {
    pub fn new(config: SteamConfig) -> Result<Self, SteamApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SteamApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &SteamConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SteamApiError> {
        trace!("Sending REST query: {url}");
        let mut req = self.client.get(url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| SteamApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| SteamApiError::JsonError(e.to_string()))
        } else if response.status() == StatusCode::FORBIDDEN {
            Err(SteamApiError::PrivateInventory)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| SteamApiError::RestResponseError(e.to_string()))?;
            Err(SteamApiError::QueryError { status, message })
        }
    }

    pub fn inventory_url(&self, steam_id: &str) -> String {
        format!(
            "{}/profiles/{steam_id}/inventory/json/{}/{}",
            self.config.community_url, self.config.app_id, self.config.context_id
        )
    }

    /// Fetches the unprocessed inventory document for the given Steam id.
    pub async fn raw_inventory(&self, steam_id: &str) -> Result<RawInventory, SteamApiError> {
        let url = self.inventory_url(steam_id);
        debug!("Fetching inventory for {steam_id}");
        let raw = self.rest_query::<RawInventory>(&url, &[]).await?;
        if raw.is_private() {
            debug!("Inventory for {steam_id} is private");
            return Err(SteamApiError::PrivateInventory);
        }
        if let Some(e) = raw.failure() {
            return Err(SteamApiError::InventoryError(e.to_string()));
        }
        Ok(raw)
    }

    /// Fetches and flattens the inventory for the given Steam id.
    pub async fn inventory(&self, steam_id: &str) -> Result<Vec<InventoryAsset>, SteamApiError> {
        let raw = self.raw_inventory(steam_id).await?;
        let assets = raw.to_assets();
        info!("Fetched {} item classes from the inventory of {steam_id}", assets.len());
        Ok(assets)
    }

    /// Resolves a custom profile name into its Steam id.
    pub async fn resolve_vanity_url(&self, vanity: &str) -> Result<String, SteamApiError> {
        #[derive(Deserialize)]
        struct VanityResponse {
            response: VanityResult,
        }
        #[derive(Deserialize)]
        struct VanityResult {
            success: i32,
            steamid: Option<String>,
            message: Option<String>,
        }
        if self.config.api_key.is_empty() {
            return Err(SteamApiError::MissingApiKey("vanity URL resolution"));
        }
        let url = format!("{}/ISteamUser/ResolveVanityURL/v0001/", self.config.api_url);
        let key = self.config.api_key.reveal().as_str();
        let result = self.rest_query::<VanityResponse>(&url, &[("key", key), ("vanityurl", vanity)]).await?.response;
        match (result.success, result.steamid) {
            (1, Some(id)) => {
                debug!("Resolved vanity name {vanity} to {id}");
                Ok(id)
            },
            (_, _) => {
                let reason = result.message.unwrap_or_else(|| "no match".to_string());
                debug!("Could not resolve vanity name {vanity}: {reason}");
                Err(SteamApiError::ProfileNotFound(vanity.to_string()))
            },
        }
    }

    /// Turns any supported profile reference (id, vanity name or profile URL) into a canonical Steam id.
    pub async fn resolve_profile(&self, reference: &str) -> Result<String, SteamApiError> {
        match parse_profile_reference(reference)? {
            ProfileReference::SteamId(id) => Ok(id),
            ProfileReference::Vanity(name) => self.resolve_vanity_url(&name).await,
        }
    }
}
