use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The parts of an inventory entry that verification looks at. A snapshot of the matched entries is stored with each
/// verification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    /// Persona name of whoever gifted the item, if the item was a gift.
    pub gifter: String,
    pub date_received: String,
    pub dedication: String,
    pub tags: Vec<String>,
    /// False while a received gift is still in its wrapping. Snapshots stored before the flag existed read as opened.
    #[serde(default = "opened")]
    pub gift_opened: bool,
}

fn opened() -> bool {
    true
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            name: String::new(),
            gifter: String::new(),
            date_received: String::new(),
            dedication: String::new(),
            tags: Vec::new(),
            gift_opened: opened(),
        }
    }
}

impl Asset {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn gifted_by<S: Into<String>>(mut self, gifter: S) -> Self {
        self.gifter = gifter.into();
        self
    }

    pub fn still_wrapped(mut self) -> Self {
        self.gift_opened = false;
        self
    }
}

/// True if any of the assets is a gift the recipient has not unwrapped yet.
pub fn has_wrapped_gift(assets: &[Asset]) -> bool {
    assets.iter().any(|a| !a.gift_opened)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("The inventory is private")]
    Private,
    #[error("Could not fetch inventory: {0}")]
    Fetch(String),
}

/// Anything that can list the public inventory of a profile.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_inventory(&self, profile_id: &str) -> Result<Vec<Asset>, InventoryError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snapshots_without_the_flag_read_as_opened() {
        let json = r#"{"name": "Arcana", "gifter": "alice", "date_received": "", "dedication": "", "tags": []}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert!(asset.gift_opened);
        assert!(!has_wrapped_gift(&[asset.clone()]));
        assert!(has_wrapped_gift(&[asset, Asset::new("Arcana").gifted_by("alice").still_wrapped()]));
    }
}
