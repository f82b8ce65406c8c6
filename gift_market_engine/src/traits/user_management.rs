use async_trait::async_trait;

use crate::{
    db_types::{Item, NewItem, NewUser, OrderStatusCounts, User},
    traits::StoreError,
};

/// Users and items are owned by the identity and catalogue layers; the market reads them and keeps the rank score
/// up to date.
#[async_trait]
pub trait UserManagement: Send + Sync {
    async fn fetch_user(&self, id: i64) -> Result<User, StoreError>;

    async fn fetch_user_by_profile_id(&self, profile_id: &str) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn fetch_item(&self, id: i64) -> Result<Item, StoreError>;

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError>;

    /// The number of orders the user owns, per status.
    async fn order_status_counts(&self, user_id: i64) -> Result<OrderStatusCounts, StoreError>;

    async fn update_rank_score(&self, user_id: i64, score: i64) -> Result<User, StoreError>;
}
