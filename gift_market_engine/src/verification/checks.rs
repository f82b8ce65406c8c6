use log::*;
use thiserror::Error;

use super::{Asset, InventoryError, InventorySource, VerificationStatus};

/// The classification of one inventory read, with every inventory entry whose name matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub status: VerificationStatus,
    pub assets: Vec<Asset>,
}

impl Verification {
    fn new(status: VerificationStatus, assets: Vec<Asset>) -> Self {
        Self { status, assets }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Missing verification parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Inventory source failure: {0}")]
    Upstream(String),
}

impl VerificationError {
    /// The status a failed attempt is recorded under.
    pub fn status(&self) -> VerificationStatus {
        VerificationStatus::Error
    }
}

fn require(value: &str, name: &'static str) -> Result<(), VerificationError> {
    if value.is_empty() {
        Err(VerificationError::MissingParameter(name))
    } else {
        Ok(())
    }
}

/// Fetches the inventory. `Ok(None)` means the inventory is private.
async fn fetch<S>(source: &S, profile_id: &str) -> Result<Option<Vec<Asset>>, VerificationError>
where S: InventorySource + ?Sized {
    match source.fetch_inventory(profile_id).await {
        Ok(assets) => Ok(Some(assets)),
        Err(InventoryError::Private) => {
            debug!("🔍️ Inventory of {profile_id} is private");
            Ok(None)
        },
        Err(InventoryError::Fetch(e)) => {
            warn!("🔍️ Could not fetch the inventory of {profile_id}. {e}");
            Err(VerificationError::Upstream(e))
        },
    }
}

fn matching_assets(assets: Vec<Asset>, item_name: &str) -> Vec<Asset> {
    assets.into_iter().filter(|a| a.name == item_name).collect()
}

/// Checks whether `buyer_profile_id` received `item_name` from the seller trading as `gifter`.
///
/// * A private inventory yields [`VerificationStatus::Private`] and no error.
/// * No entry named exactly `item_name` yields [`VerificationStatus::NoHit`].
/// * If any matching entry was gifted by exactly `gifter` the result is [`VerificationStatus::SenderVerified`],
///   otherwise [`VerificationStatus::NameVerified`].
///
/// All matching entries are returned, whichever one decided the status.
pub async fn verify_delivery<S>(
    source: &S,
    gifter: &str,
    buyer_profile_id: &str,
    item_name: &str,
) -> Result<Verification, VerificationError>
where
    S: InventorySource + ?Sized,
{
    require(gifter, "gifter")?;
    require(buyer_profile_id, "buyer profile id")?;
    require(item_name, "item name")?;
    let assets = match fetch(source, buyer_profile_id).await? {
        Some(assets) => assets,
        None => return Ok(Verification::new(VerificationStatus::Private, vec![])),
    };
    let assets = matching_assets(assets, item_name);
    if assets.is_empty() {
        trace!("🔍️ {buyer_profile_id} has no {item_name}");
        return Ok(Verification::new(VerificationStatus::NoHit, assets));
    }
    let status = if assets.iter().any(|a| a.gifter == gifter) {
        VerificationStatus::SenderVerified
    } else {
        VerificationStatus::NameVerified
    };
    trace!("🔍️ Delivery of {item_name} to {buyer_profile_id}: {status}");
    Ok(Verification::new(status, assets))
}

/// Checks whether `seller_profile_id` holds at least one `item_name`.
pub async fn verify_inventory<S>(
    source: &S,
    seller_profile_id: &str,
    item_name: &str,
) -> Result<Verification, VerificationError>
where
    S: InventorySource + ?Sized,
{
    require(seller_profile_id, "seller profile id")?;
    require(item_name, "item name")?;
    let assets = match fetch(source, seller_profile_id).await? {
        Some(assets) => assets,
        None => return Ok(Verification::new(VerificationStatus::Private, vec![])),
    };
    let assets = matching_assets(assets, item_name);
    let status =
        if assets.is_empty() { VerificationStatus::NoHit } else { VerificationStatus::NameVerified };
    trace!("🔍️ Inventory of {seller_profile_id} for {item_name}: {status}");
    Ok(Verification::new(status, assets))
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct StaticInventory {
        result: Result<Vec<Asset>, InventoryError>,
        calls: AtomicUsize,
    }

    impl StaticInventory {
        fn new(result: Result<Vec<Asset>, InventoryError>) -> Self {
            Self { result, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl InventorySource for StaticInventory {
        async fn fetch_inventory(&self, _profile_id: &str) -> Result<Vec<Asset>, InventoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn inventory() -> Vec<Asset> {
        vec![
            Asset::new("Dark Artistry Cape").gifted_by("someone else"),
            Asset::new("Dark Artistry Cape").gifted_by("seller"),
            Asset::new("Tempest Helm of the Thundergod"),
        ]
    }

    #[tokio::test]
    async fn sender_verified_when_any_gifter_matches() {
        let source = StaticInventory::new(Ok(inventory()));
        let result = verify_delivery(&source, "seller", "buyer", "Dark Artistry Cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::SenderVerified);
        assert_eq!(result.assets.len(), 2);
    }

    #[tokio::test]
    async fn name_verified_without_matching_gifter() {
        let source = StaticInventory::new(Ok(inventory()));
        let result = verify_delivery(&source, "Seller", "buyer", "Dark Artistry Cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::NameVerified);
        assert_eq!(result.assets.len(), 2);
    }

    #[tokio::test]
    async fn no_hit_on_inexact_name() {
        let source = StaticInventory::new(Ok(inventory()));
        let result = verify_delivery(&source, "seller", "buyer", "dark artistry cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::NoHit);
        assert!(result.assets.is_empty());
    }

    #[tokio::test]
    async fn private_is_not_an_error() {
        let source = StaticInventory::new(Err(InventoryError::Private));
        let result = verify_delivery(&source, "seller", "buyer", "Dark Artistry Cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::Private);
        assert!(result.assets.is_empty());
    }

    #[tokio::test]
    async fn fetch_failures_are_errors() {
        let source = StaticInventory::new(Err(InventoryError::Fetch("timeout".into())));
        let err = verify_delivery(&source, "seller", "buyer", "Dark Artistry Cape").await.unwrap_err();
        assert_eq!(err, VerificationError::Upstream("timeout".into()));
        assert_eq!(err.status(), VerificationStatus::Error);
    }

    #[tokio::test]
    async fn empty_parameters_never_reach_the_source() {
        let source = StaticInventory::new(Ok(inventory()));
        for (gifter, buyer, item) in [("", "buyer", "x"), ("seller", "", "x"), ("seller", "buyer", "")] {
            let err = verify_delivery(&source, gifter, buyer, item).await.unwrap_err();
            assert!(matches!(err, VerificationError::MissingParameter(_)));
        }
        assert!(verify_inventory(&source, "", "x").await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitespace_is_a_value() {
        let source = StaticInventory::new(Err(InventoryError::Private));
        let result = verify_delivery(&source, "  ", "buyer", "Dark Artistry Cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::Private);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let source = StaticInventory::new(Ok(inventory()));
        let result = verify_delivery(&source, " ", "buyer", "Dark Artistry Cape").await.unwrap();
        assert_eq!(result.status, VerificationStatus::NameVerified);
    }

    #[tokio::test]
    async fn inventory_checks() {
        let source = StaticInventory::new(Ok(inventory()));
        let found = verify_inventory(&source, "seller", "Tempest Helm of the Thundergod").await.unwrap();
        assert_eq!(found.status, VerificationStatus::NameVerified);
        assert_eq!(found.assets.len(), 1);
        let missing = verify_inventory(&source, "seller", "Golden Baby Roshan").await.unwrap();
        assert_eq!(missing.status, VerificationStatus::NoHit);
        let private = verify_inventory(&StaticInventory::new(Err(InventoryError::Private)), "seller", "x").await;
        assert_eq!(private.unwrap().status, VerificationStatus::Private);
    }
}
