//! In-memory stand-ins for the external collaborators of the engine.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    market_api::profile_resolver::{ProfileResolutionError, ProfileResolver},
    verification::{Asset, InventoryError, InventorySource},
};

/// Inventories keyed by profile id. Unknown profiles have an empty inventory.
#[derive(Debug, Clone, Default)]
pub struct FakeInventory {
    inventories: Arc<Mutex<HashMap<String, Result<Vec<Asset>, InventoryError>>>>,
}

impl FakeInventory {
    pub fn set_assets(&self, profile_id: &str, assets: Vec<Asset>) {
        self.set(profile_id, Ok(assets));
    }

    pub fn set_private(&self, profile_id: &str) {
        self.set(profile_id, Err(InventoryError::Private));
    }

    pub fn set_failing(&self, profile_id: &str, message: &str) {
        self.set(profile_id, Err(InventoryError::Fetch(message.to_string())));
    }

    fn set(&self, profile_id: &str, value: Result<Vec<Asset>, InventoryError>) {
        let mut inventories = self.inventories.lock().expect("Inventory lock poisoned");
        inventories.insert(profile_id.to_string(), value);
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn fetch_inventory(&self, profile_id: &str) -> Result<Vec<Asset>, InventoryError> {
        let inventories = self.inventories.lock().expect("Inventory lock poisoned");
        inventories.get(profile_id).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Resolves vanity names from a fixed table. Anything that looks like a canonical id resolves to itself.
#[derive(Debug, Clone, Default)]
pub struct FakeProfiles {
    vanity: Arc<Mutex<HashMap<String, String>>>,
}

impl FakeProfiles {
    pub fn with_vanity(self, name: &str, profile_id: &str) -> Self {
        self.vanity.lock().expect("Profile lock poisoned").insert(name.to_string(), profile_id.to_string());
        self
    }
}

#[async_trait]
impl ProfileResolver for FakeProfiles {
    async fn resolve_profile_id(&self, reference: &str) -> Result<String, ProfileResolutionError> {
        let reference = reference.trim();
        if reference.len() == 17 && reference.chars().all(|c| c.is_ascii_digit()) {
            return Ok(reference.to_string());
        }
        let vanity = self.vanity.lock().expect("Profile lock poisoned");
        vanity.get(reference).cloned().ok_or_else(|| ProfileResolutionError(format!("No profile named {reference}")))
    }
}
