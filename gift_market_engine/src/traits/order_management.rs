use async_trait::async_trait;

use crate::{
    db_types::{NewOrder, Order, OrderUpdate},
    traits::{InsertGuard, InsertedOrder, OrderFilter, OrderQuery, StoreError},
};

/// Persistence of asks and bids.
#[async_trait]
pub trait OrderManagement: Send + Sync {
    /// Fetches the order with the given id, or [`StoreError::OrderNotFound`].
    async fn fetch_order(&self, id: i64) -> Result<Order, StoreError>;

    /// Fetches the orders matching the query, in the requested sort order and page.
    async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;

    /// Counts the orders matching the filter.
    async fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError>;

    /// Stores a new order after applying the `guard` to the owner's live orders of the same type on the same item.
    ///
    /// The guard's count and retirement happen in the same transaction as the insert, and no other writer may slip in
    /// between them. Either all of it happens or none of it does.
    async fn insert_order(&self, order: NewOrder, guard: InsertGuard) -> Result<InsertedOrder, StoreError>;

    /// Applies all of the given updates in a single transaction and returns the updated orders in the same order.
    ///
    /// If any order does not exist, nothing is written and [`StoreError::OrderNotFound`] is returned.
    async fn update_orders(&self, updates: &[OrderUpdate]) -> Result<Vec<Order>, StoreError>;
}
