use async_trait::async_trait;

use crate::{
    db_types::{NewVerification, VerificationKind, VerificationRecord, VerificationUpdate},
    traits::{CandidateQuery, OrderDetails, Pagination, StoreError, VerificationFilter},
};

/// Persistence of verification records. There is at most one record per order and kind.
#[async_trait]
pub trait VerificationManagement: Send + Sync {
    async fn fetch_verification(
        &self,
        order_id: i64,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRecord>, StoreError>;

    /// Records matching the filter, most recently updated first.
    async fn fetch_verifications(
        &self,
        filter: &VerificationFilter,
        page: Option<Pagination>,
    ) -> Result<Vec<VerificationRecord>, StoreError>;

    async fn count_verifications(&self, filter: &VerificationFilter) -> Result<i64, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the order already has a record of this kind.
    async fn insert_verification(&self, record: NewVerification) -> Result<VerificationRecord, StoreError>;

    async fn update_verification(&self, id: i64, update: VerificationUpdate) -> Result<VerificationRecord, StoreError>;

    /// One page of orders awaiting verification, with owner, item and current record attached. See
    /// [`CandidateQuery`] for the selection rules.
    async fn fetch_verification_candidates(&self, query: &CandidateQuery) -> Result<Vec<OrderDetails>, StoreError>;
}
