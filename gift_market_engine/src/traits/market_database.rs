use async_trait::async_trait;

use crate::traits::{OrderManagement, UserManagement, VerificationManagement};

/// The highest level of behaviour for backends supporting the gift market.
#[async_trait]
pub trait MarketDatabase: Clone + OrderManagement + UserManagement + VerificationManagement + 'static {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes all connections. The database must not be used afterwards.
    async fn close(&self);
}
