use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::helpers::{extract_prefixed_value, has_flag};

const PREFIX_HERO: &str = "Used By: ";
const PREFIX_GIFT_FROM: &str = "Gift From: ";
const PREFIX_DATE_RECEIVED: &str = "Date Received: ";
const PREFIX_DEDICATION: &str = "Dedication: ";
const FLAG_NOT_TRADABLE: &str = "( Not Tradable )";
const FLAG_GIFT_ONCE: &str = "( This item may be gifted once )";
const PRIVATE_PROFILE_ERROR: &str = "this profile is private.";

//--------------------------------------    RawInventory      ---------------------------------------------------------
/// The legacy community inventory document (`/profiles/{id}/inventory/json/{app}/{context}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInventory {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub more: bool,
    #[serde(default, deserialize_with = "page_offset")]
    pub more_start: u64,
    #[serde(default, rename = "rgInventory", deserialize_with = "map_or_list")]
    pub assets: HashMap<String, RawAsset>,
    #[serde(default, rename = "rgDescriptions", deserialize_with = "map_or_list")]
    pub descriptions: HashMap<String, RawDescription>,
    #[serde(default, rename = "Error")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAsset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub classid: String,
    #[serde(default)]
    pub instanceid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDescription {
    #[serde(default)]
    pub classid: String,
    #[serde(default)]
    pub instanceid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "icon_url_large")]
    pub image: String,
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default, deserialize_with = "details")]
    pub descriptions: Vec<RawDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetail {
    #[serde(default)]
    pub value: String,
}

impl RawInventory {
    pub fn is_private(&self) -> bool {
        self.error.as_deref().map(|e| e.trim().to_lowercase() == PRIVATE_PROFILE_ERROR).unwrap_or(false)
    }

    /// Any error message other than the private-profile one.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Collapses the asset and description maps into one entry per item class, with quantities.
    pub fn to_assets(&self) -> Vec<InventoryAsset> {
        let mut instances: HashMap<&str, (&str, Vec<String>)> = HashMap::new();
        for asset in self.assets.values() {
            instances
                .entry(asset.classid.as_str())
                .or_insert_with(|| (asset.id.as_str(), Vec::new()))
                .1
                .push(asset.instanceid.clone());
        }
        let mut result = self
            .descriptions
            .values()
            .map(|desc| {
                let mut asset = desc.to_asset();
                if let Some((asset_id, ids)) = instances.get(desc.classid.as_str()) {
                    asset.asset_id = asset_id.to_string();
                    asset.qty = ids.len();
                    asset.instance_ids = ids.clone();
                }
                asset
            })
            .collect::<Vec<InventoryAsset>>();
        result.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.class_id.cmp(&b.class_id)));
        result
    }
}

impl RawDescription {
    pub fn to_asset(&self) -> InventoryAsset {
        let mut asset = InventoryAsset {
            class_id: self.classid.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            item_type: self.item_type.clone(),
            ..Default::default()
        };
        for detail in &self.descriptions {
            let v = detail.value.as_str();
            if let Some(hero) = extract_prefixed_value(v, PREFIX_HERO) {
                asset.hero = hero.to_string();
            }
            if let Some(gifter) = extract_prefixed_value(v, PREFIX_GIFT_FROM) {
                asset.gift_from = gifter.to_string();
            }
            if let Some(date) = extract_prefixed_value(v, PREFIX_DATE_RECEIVED) {
                asset.date_received = date.to_string();
            }
            if let Some(dedication) = extract_prefixed_value(v, PREFIX_DEDICATION) {
                asset.dedication = dedication.to_string();
            }
            asset.gift_once |= has_flag(v, FLAG_GIFT_ONCE);
            asset.not_tradable |= has_flag(v, FLAG_NOT_TRADABLE);
            asset.descriptions.push(v.to_string());
        }
        asset
    }
}

//--------------------------------------   InventoryAsset     ---------------------------------------------------------
/// Flattened view of one item class in an inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAsset {
    pub asset_id: String,
    pub class_id: String,
    pub instance_ids: Vec<String>,
    pub qty: usize,
    pub name: String,
    pub image: String,
    pub item_type: String,
    pub hero: String,
    pub gift_from: String,
    pub date_received: String,
    pub dedication: String,
    pub gift_once: bool,
    pub not_tradable: bool,
    pub descriptions: Vec<String>,
}

impl InventoryAsset {
    pub fn is_bundle(&self) -> bool {
        self.item_type.ends_with("Bundle")
    }
}

//--------------------------------------   Deserializers      ---------------------------------------------------------
// Steam sends `[]` instead of `{}` for empty maps.
fn map_or_list<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(HashMap<String, T>),
        List(Vec<T>),
    }
    let value = Option::<MapOrList<T>>::deserialize(deserializer)?;
    Ok(match value {
        Some(MapOrList::Map(map)) => map,
        Some(MapOrList::List(list)) => list.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        None => HashMap::new(),
    })
}

// `more_start` is `false` on the last page.
fn page_offset<'de, D>(deserializer: D) -> Result<u64, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Offset {
        Flag(bool),
        Start(u64),
    }
    Ok(match Option::<Offset>::deserialize(deserializer)? {
        Some(Offset::Start(n)) => n,
        _ => 0,
    })
}

// Items without details carry an empty string.
fn details<'de, D>(deserializer: D) -> Result<Vec<RawDetail>, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Details {
        List(Vec<RawDetail>),
        Text(String),
    }
    Ok(match Option::<Details>::deserialize(deserializer)? {
        Some(Details::List(list)) => list,
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const INVENTORY: &str = r#"{
        "success": true,
        "rgInventory": {
            "1001": { "id": "1001", "classid": "77", "instanceid": "1" },
            "1002": { "id": "1002", "classid": "77", "instanceid": "2" },
            "1003": { "id": "1003", "classid": "88", "instanceid": "0" }
        },
        "rgCurrency": [],
        "rgDescriptions": {
            "77_1": {
                "classid": "77",
                "instanceid": "1",
                "name": "Dark Artistry Cape",
                "type": "Immortal Back",
                "descriptions": [
                    { "type": "html", "value": "Used By: Invoker" },
                    { "type": "html", "value": "( This item may be gifted once )" },
                    { "type": "html", "value": "Gift From: Seller Persona" },
                    { "type": "html", "value": "Date Received: Jan 02, 2021 (1:00:00)" },
                    { "type": "html", "value": "Dedication: enjoy!" }
                ]
            },
            "88_0": {
                "classid": "88",
                "instanceid": "0",
                "name": "Bundle of Joy",
                "type": "Rare Bundle",
                "descriptions": ""
            }
        },
        "more": false,
        "more_start": false
    }"#;

    #[test]
    fn parses_inventory_document() {
        let raw: RawInventory = serde_json::from_str(INVENTORY).unwrap();
        assert!(raw.success);
        assert!(!raw.is_private());
        assert_eq!(raw.more_start, 0);
        let assets = raw.to_assets();
        assert_eq!(assets.len(), 2);
        let bundle = &assets[0];
        assert_eq!(bundle.name, "Bundle of Joy");
        assert!(bundle.is_bundle());
        assert!(bundle.descriptions.is_empty());
        assert_eq!(bundle.qty, 1);
        let cape = &assets[1];
        assert_eq!(cape.name, "Dark Artistry Cape");
        assert_eq!(cape.qty, 2);
        assert_eq!(cape.hero, "Invoker");
        assert_eq!(cape.gift_from, "Seller Persona");
        assert_eq!(cape.date_received, "Jan 02, 2021 (1:00:00)");
        assert_eq!(cape.dedication, "enjoy!");
        assert!(cape.gift_once);
        assert!(!cape.not_tradable);
    }

    #[test]
    fn detects_private_profiles() {
        let json = r#"{"success": false, "Error": "This profile is private."}"#;
        let raw: RawInventory = serde_json::from_str(json).unwrap();
        assert!(raw.is_private());
        assert!(raw.to_assets().is_empty());
    }

    #[test]
    fn empty_inventories_use_lists() {
        let raw: RawInventory =
            serde_json::from_str(r#"{"success": true, "rgInventory": [], "rgDescriptions": [], "more_start": 0}"#)
                .unwrap();
        assert!(raw.to_assets().is_empty());
        assert!(raw.failure().is_none());
    }
}
