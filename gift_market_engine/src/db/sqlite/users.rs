use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Item, NewItem, NewUser, OrderStatusCounts, OrderStatusType, User},
    traits::StoreError,
};

const USER_COLUMNS: &str = "id, profile_id, name, status, boons, rank_score, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, name, active, created_at, updated_at";

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_profile_id(
    profile_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE profile_id = ?");
    let user = sqlx::query_as::<_, User>(&sql).bind(profile_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, StoreError> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO users (profile_id, name, status, boons, rank_score, created_at, updated_at) VALUES (?, ?, ?, ?, \
         0, ?, ?) RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user.profile_id)
        .bind(user.name)
        .bind(user.status)
        .bind(user.boons.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ User #{} ({}) created", user.id, user.profile_id);
    Ok(user)
}

pub async fn update_rank_score(user_id: i64, score: i64, conn: &mut SqliteConnection) -> Result<User, StoreError> {
    let sql = format!("UPDATE users SET rank_score = ?, updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(score)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::UserNotFound(user_id))?;
    Ok(user)
}

pub async fn order_status_counts(user_id: i64, conn: &mut SqliteConnection) -> Result<OrderStatusCounts, StoreError> {
    let rows = sqlx::query_as::<_, (OrderStatusType, i64)>(
        "SELECT status, COUNT(*) FROM orders WHERE user_id = ? GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    let mut counts = OrderStatusCounts::default();
    for (status, count) in rows {
        counts.add(status, count);
    }
    Ok(counts)
}

pub async fn fetch_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<Item>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?");
    let item = sqlx::query_as::<_, Item>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn insert_item(item: NewItem, conn: &mut SqliteConnection) -> Result<Item, StoreError> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO items (name, active, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {ITEM_COLUMNS}"
    );
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(item.name)
        .bind(item.active)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Item #{} ({}) created", item.id, item.name);
    Ok(item)
}
