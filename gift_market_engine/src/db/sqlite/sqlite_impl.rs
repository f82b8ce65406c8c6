//! `SqliteDatabase` is a concrete implementation of a gift market backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{begin_immediate, db_url, end_transaction, new_pool, orders, users, verifications};
use crate::{
    db_types::{
        Item,
        NewItem,
        NewOrder,
        NewUser,
        NewVerification,
        Order,
        OrderStatusCounts,
        OrderUpdate,
        User,
        VerificationKind,
        VerificationRecord,
        VerificationUpdate,
    },
    traits::{
        CandidateQuery,
        InsertGuard,
        InsertedOrder,
        MarketDatabase,
        OrderDetails,
        OrderFilter,
        OrderManagement,
        OrderQuery,
        Pagination,
        StoreError,
        UserManagement,
        VerificationFilter,
        VerificationManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `GMX_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, StoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new connection pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migrations failed. {e}")))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MarketDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("🗃️ Connection pool for {} closed", self.url);
    }
}

#[async_trait]
impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await?.ok_or(StoreError::OrderNotFound(id))
    }

    async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::count_orders(filter, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder, guard: InsertGuard) -> Result<InsertedOrder, StoreError> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = orders::insert_guarded(order, guard, &mut conn).await;
        end_transaction(result, &mut conn).await
    }

    async fn update_orders(&self, updates: &[OrderUpdate]) -> Result<Vec<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut result = Vec::with_capacity(updates.len());
        for update in updates {
            let order = orders::update_order(update, &mut tx).await?;
            result.push(order);
        }
        tx.commit().await?;
        Ok(result)
    }
}

#[async_trait]
impl UserManagement for SqliteDatabase {
    async fn fetch_user(&self, id: i64) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(id, &mut conn).await?.ok_or(StoreError::UserNotFound(id))
    }

    async fn fetch_user_by_profile_id(&self, profile_id: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_profile_id(profile_id, &mut conn).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn fetch_item(&self, id: i64) -> Result<Item, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_item(id, &mut conn).await?.ok_or(StoreError::ItemNotFound(id))
    }

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_item(item, &mut conn).await
    }

    async fn order_status_counts(&self, user_id: i64) -> Result<OrderStatusCounts, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::order_status_counts(user_id, &mut conn).await
    }

    async fn update_rank_score(&self, user_id: i64, score: i64) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::update_rank_score(user_id, score, &mut conn).await
    }
}

#[async_trait]
impl VerificationManagement for SqliteDatabase {
    async fn fetch_verification(
        &self,
        order_id: i64,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::fetch_verification(order_id, kind, &mut conn).await
    }

    async fn fetch_verifications(
        &self,
        filter: &VerificationFilter,
        page: Option<Pagination>,
    ) -> Result<Vec<VerificationRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::fetch_verifications(filter, page, &mut conn).await
    }

    async fn count_verifications(&self, filter: &VerificationFilter) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::count_verifications(filter, &mut conn).await
    }

    async fn insert_verification(&self, record: NewVerification) -> Result<VerificationRecord, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::insert_verification(record, &mut conn).await
    }

    async fn update_verification(&self, id: i64, update: VerificationUpdate) -> Result<VerificationRecord, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::update_verification(id, update, &mut conn).await
    }

    async fn fetch_verification_candidates(&self, query: &CandidateQuery) -> Result<Vec<OrderDetails>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        verifications::fetch_candidates(query, &mut conn).await
    }
}
