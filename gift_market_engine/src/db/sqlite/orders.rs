use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderStatusType, OrderType, OrderUpdate},
    traits::{InsertGuard, InsertedOrder, OrderFilter, OrderQuery, StoreError},
};

pub(crate) const ORDER_COLUMNS: &str = "id, user_id, item_id, order_type, status, price, currency, notes, \
                                        counterparty_profile_id, seller_profile_id, resell, created_at, updated_at";

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO orders (user_id, item_id, order_type, status, price, currency, notes, counterparty_profile_id, \
         seller_profile_id, resell, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING \
         {ORDER_COLUMNS}"
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(order.user_id)
        .bind(order.item_id)
        .bind(order.order_type)
        .bind(order.status)
        .bind(order.price)
        .bind(order.currency)
        .bind(order.notes)
        .bind(order.counterparty_profile_id)
        .bind(order.seller_profile_id)
        .bind(order.resell)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ {} #{} has been saved in the DB", order.order_type, order.id);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(order)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(item_id) = filter.item_id {
        where_clause.push("item_id = ");
        where_clause.push_bind_unseparated(item_id);
    }
    if let Some(order_type) = filter.order_type {
        where_clause.push("order_type = ");
        where_clause.push_bind_unseparated(order_type);
    }
    if let Some(profile_id) = &filter.counterparty_profile_id {
        where_clause.push("counterparty_profile_id = ");
        where_clause.push_bind_unseparated(profile_id.clone());
    }
    if !filter.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in filter.statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(*status);
        }
        where_clause.push_unseparated(")");
    }
}

/// Fetches orders according to the criteria, sort order and page in the `OrderQuery`.
///
/// Ties on the sort column are broken by id, in the same direction.
pub async fn fetch_orders(query: &OrderQuery, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_filter(&mut builder, &query.filter);
    let direction = query.sort.direction.keyword();
    builder.push(format!(" ORDER BY {} {direction}, id {direction}", query.sort.field.column()));
    if let Some(page) = query.page {
        builder.push(" LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

pub async fn count_orders(filter: &OrderFilter, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut builder, filter);
    trace!("🗃️ Executing query: {}", builder.sql());
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}

/// Checks the guard against the owner's live orders of the same type on the item, then inserts the order. Run it
/// inside a transaction that already holds the write lock, or the count can be raced.
pub async fn insert_guarded(
    order: NewOrder,
    guard: InsertGuard,
    conn: &mut SqliteConnection,
) -> Result<InsertedOrder, StoreError> {
    if let Some(limit) = guard.live_limit {
        let live = OrderFilter::default()
            .with_user_id(order.user_id)
            .with_item_id(order.item_id)
            .with_type(order.order_type)
            .with_status(OrderStatusType::Live);
        let count = count_orders(&live, conn).await?;
        if count >= limit {
            debug!("🗃️ User #{} already holds {count} live orders on item #{}", order.user_id, order.item_id);
            return Err(StoreError::LiveLimitReached(limit));
        }
    }
    let retired = if guard.retire_live {
        retire_live_orders(order.user_id, order.item_id, order.order_type, conn).await?
    } else {
        Vec::new()
    };
    let order = insert_order(order, conn).await?;
    Ok(InsertedOrder { order, retired })
}

/// Moves the user's live orders of the given type on the item to `Removed` and returns them as they are now.
pub async fn retire_live_orders(
    user_id: i64,
    item_id: i64,
    order_type: OrderType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StoreError> {
    let sql = format!(
        "UPDATE orders SET status = ?, updated_at = ? WHERE user_id = ? AND item_id = ? AND order_type = ? AND status \
         = ? RETURNING {ORDER_COLUMNS}"
    );
    let retired = sqlx::query_as::<_, Order>(&sql)
        .bind(OrderStatusType::Removed)
        .bind(Utc::now())
        .bind(user_id)
        .bind(item_id)
        .bind(order_type)
        .bind(OrderStatusType::Live)
        .fetch_all(conn)
        .await?;
    if !retired.is_empty() {
        debug!("🗃️ Retired {} live {order_type} orders of user #{user_id} on item #{item_id}", retired.len());
    }
    Ok(retired)
}

/// Applies the update and returns the order as it is now. An empty update writes nothing and just fetches the order.
pub async fn update_order(update: &OrderUpdate, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for order {}. Update request skipped.", update.id);
        return fetch_order(update.id, conn).await?.ok_or(StoreError::OrderNotFound(update.id));
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(notes) = &update.notes {
        builder.push(", notes = ");
        builder.push_bind(notes.clone());
    }
    if let Some(profile_id) = &update.counterparty_profile_id {
        builder.push(", counterparty_profile_id = ");
        builder.push_bind(profile_id.clone());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(update.id);
    builder.push(format!(" RETURNING {ORDER_COLUMNS}"));
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    order.ok_or(StoreError::OrderNotFound(update.id))
}
