use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        Asset,
        ConversionError,
        NewVerification,
        VerificationKind,
        VerificationRecord,
        VerificationStatus,
        VerificationUpdate,
    },
    market_api::errors::VerificationApiError,
    traits::{CandidateQuery, OrderDetails, StoreError, VerificationManagement},
};

/// How a new verification result is merged with the one already on record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusPolicy {
    /// A result ranked below the recorded status leaves status and assets untouched. The attempt still counts.
    #[default]
    UpgradeOnly,
    /// The latest result always replaces the recorded one.
    FreshestWins,
}

impl StatusPolicy {
    /// Returns true if `new` should replace `current`.
    pub fn accepts(&self, current: VerificationStatus, new: VerificationStatus) -> bool {
        match self {
            StatusPolicy::UpgradeOnly => new >= current,
            StatusPolicy::FreshestWins => true,
        }
    }
}

impl Display for StatusPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusPolicy::UpgradeOnly => write!(f, "upgrade_only"),
            StatusPolicy::FreshestWins => write!(f, "freshest_wins"),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upgrade_only" | "upgradeonly" => Ok(Self::UpgradeOnly),
            "freshest_wins" | "freshestwins" => Ok(Self::FreshestWins),
            s => Err(ConversionError(format!("Invalid status policy: {s}"))),
        }
    }
}

/// Writes verification outcomes. There is one record per order and kind; every attempt either creates it or updates
/// it in place.
#[derive(Clone)]
pub struct VerificationApi<B> {
    db: B,
    policy: StatusPolicy,
}

impl<B> Debug for VerificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi ({:?})", self.policy)
    }
}

impl<B> VerificationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: StatusPolicy::default() }
    }

    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> VerificationApi<B>
where B: VerificationManagement
{
    /// Stores the outcome of one verification attempt for the order.
    ///
    /// The retry counter goes up by one unless the outcome is final for the verification kind (see
    /// [`VerificationKind::is_final`]). The store does the increment, so
    /// concurrent attempts are all counted. Whether the status and assets replace those on record is decided by the
    /// [`StatusPolicy`]; under `UpgradeOnly` they are only written if no other attempt changed the status meanwhile.
    pub async fn record_result(
        &self,
        order_id: i64,
        kind: VerificationKind,
        status: VerificationStatus,
        assets: Vec<Asset>,
    ) -> Result<VerificationRecord, VerificationApiError> {
        let increment = if kind.is_final(status, &assets) { 0 } else { 1 };
        match self.db.fetch_verification(order_id, kind).await? {
            Some(existing) => self.merge(existing, status, assets, increment).await,
            None => {
                let record = NewVerification { order_id, kind, status, assets: assets.clone(), retries: increment };
                match self.db.insert_verification(record).await {
                    Ok(record) => {
                        debug!("🔍️ First {kind} verification for order {order_id}: {status}");
                        Ok(record)
                    },
                    Err(StoreError::Duplicate(_)) => {
                        // Another writer created the record in the meantime.
                        let existing = self
                            .db
                            .fetch_verification(order_id, kind)
                            .await?
                            .ok_or(VerificationApiError::DatabaseError(format!(
                                "{kind} verification for order {order_id} vanished"
                            )))?;
                        self.merge(existing, status, assets, increment).await
                    },
                    Err(e) => Err(e.into()),
                }
            },
        }
    }

    async fn merge(
        &self,
        existing: VerificationRecord,
        status: VerificationStatus,
        assets: Vec<Asset>,
        increment: i64,
    ) -> Result<VerificationRecord, VerificationApiError> {
        let mut update = VerificationUpdate::new(increment);
        if self.policy.accepts(existing.status, status) {
            update = update.with_result(status, assets);
            if self.policy == StatusPolicy::UpgradeOnly {
                update = update.if_status(existing.status);
            }
        } else {
            debug!(
                "🔍️ Keeping {} on order {} ({} verification). The new result ({status}) ranks lower.",
                existing.status, existing.order_id, existing.kind
            );
        }
        let record = self.db.update_verification(existing.id, update).await?;
        trace!(
            "🔍️ {} verification for order {} is now {} ({} retries)",
            record.kind,
            record.order_id,
            record.status,
            record.retries
        );
        Ok(record)
    }

    pub async fn fetch_verification(
        &self,
        order_id: i64,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRecord>, VerificationApiError> {
        let record = self.db.fetch_verification(order_id, kind).await?;
        Ok(record)
    }

    /// One page of orders still awaiting verification.
    pub async fn pending_verifications(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<OrderDetails>, VerificationApiError> {
        let candidates = self.db.fetch_verification_candidates(query).await?;
        Ok(candidates)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn policies() {
        use VerificationStatus::*;
        let p = StatusPolicy::UpgradeOnly;
        assert!(p.accepts(NoHit, NameVerified));
        assert!(p.accepts(NoHit, NoHit));
        assert!(!p.accepts(SenderVerified, NoHit));
        assert!(!p.accepts(NoHit, Error));
        assert!(StatusPolicy::FreshestWins.accepts(SenderVerified, Error));
        assert_eq!("freshest_wins".parse::<StatusPolicy>().unwrap(), StatusPolicy::FreshestWins);
        assert_eq!("UpgradeOnly".parse::<StatusPolicy>().unwrap(), StatusPolicy::UpgradeOnly);
        assert!("sometimes".parse::<StatusPolicy>().is_err());
    }
}
