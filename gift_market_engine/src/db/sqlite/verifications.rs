use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        AccountStatus,
        Asset,
        Boons,
        Item,
        NewVerification,
        Order,
        User,
        VerificationKind,
        VerificationRecord,
        VerificationStatus,
        VerificationUpdate,
    },
    traits::{CandidateQuery, OrderDetails, Pagination, StoreError, VerificationFilter},
};

const VERIFICATION_COLUMNS: &str = "id, order_id, kind, status, assets, retries, created_at, updated_at";

/// Row shape of the `verifications` table. Assets are kept as a JSON document.
#[derive(Debug, FromRow)]
struct VerificationRow {
    id: i64,
    order_id: i64,
    kind: VerificationKind,
    status: VerificationStatus,
    assets: String,
    retries: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VerificationRow> for VerificationRecord {
    type Error = StoreError;

    fn try_from(row: VerificationRow) -> Result<Self, Self::Error> {
        let assets = decode_assets(&row.assets)?;
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            kind: row.kind,
            status: row.status,
            assets,
            retries: row.retries,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode_assets(json: &str) -> Result<Vec<Asset>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::InvalidRecord(format!("Invalid asset snapshot. {e}")))
}

fn encode_assets(assets: &[Asset]) -> Result<String, StoreError> {
    serde_json::to_string(assets).map_err(|e| StoreError::InvalidRecord(format!("Cannot serialize assets. {e}")))
}

pub async fn fetch_verification(
    order_id: i64,
    kind: VerificationKind,
    conn: &mut SqliteConnection,
) -> Result<Option<VerificationRecord>, StoreError> {
    let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE order_id = ? AND kind = ?");
    let row = sqlx::query_as::<_, VerificationRow>(&sql).bind(order_id).bind(kind).fetch_optional(conn).await?;
    row.map(VerificationRecord::try_from).transpose()
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &VerificationFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = filter.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(kind) = filter.kind {
        where_clause.push("kind = ");
        where_clause.push_bind_unseparated(kind);
    }
    if let Some(retries) = filter.max_retries {
        where_clause.push("retries <= ");
        where_clause.push_bind_unseparated(retries);
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

pub async fn fetch_verifications(
    filter: &VerificationFilter,
    page: Option<Pagination>,
    conn: &mut SqliteConnection,
) -> Result<Vec<VerificationRecord>, StoreError> {
    let mut builder = QueryBuilder::new(format!("SELECT {VERIFICATION_COLUMNS} FROM verifications"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY updated_at DESC, id DESC");
    if let Some(page) = page {
        builder.push(" LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<VerificationRow>().fetch_all(conn).await?;
    rows.into_iter().map(VerificationRecord::try_from).collect()
}

pub async fn count_verifications(filter: &VerificationFilter, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM verifications");
    push_filter(&mut builder, filter);
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}

pub async fn insert_verification(
    record: NewVerification,
    conn: &mut SqliteConnection,
) -> Result<VerificationRecord, StoreError> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO verifications (order_id, kind, status, assets, retries, created_at, updated_at) VALUES (?, ?, ?, \
         ?, ?, ?, ?) RETURNING {VERIFICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, VerificationRow>(&sql)
        .bind(record.order_id)
        .bind(record.kind)
        .bind(record.status)
        .bind(encode_assets(&record.assets)?)
        .bind(record.retries)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ {} verification #{} for order {} created: {}", row.kind, row.id, row.order_id, row.status);
    VerificationRecord::try_from(row)
}

pub async fn update_verification(
    id: i64,
    update: VerificationUpdate,
    conn: &mut SqliteConnection,
) -> Result<VerificationRecord, StoreError> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE verifications SET retries = retries + ");
    builder.push_bind(update.retry_increment);
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = update.status {
        let assets = encode_assets(&update.assets)?;
        match update.expected_status {
            Some(expected) => {
                // SET expressions all see the row as it was before the update
                builder.push(", status = CASE WHEN status = ");
                builder.push_bind(expected);
                builder.push(" THEN ");
                builder.push_bind(status);
                builder.push(" ELSE status END, assets = CASE WHEN status = ");
                builder.push_bind(expected);
                builder.push(" THEN ");
                builder.push_bind(assets);
                builder.push(" ELSE assets END");
            },
            None => {
                builder.push(", status = ");
                builder.push_bind(status);
                builder.push(", assets = ");
                builder.push_bind(assets);
            },
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(format!(" RETURNING {VERIFICATION_COLUMNS}"));
    trace!("🗃️ Executing query: {}", builder.sql());
    let row = builder.build_query_as::<VerificationRow>().fetch_optional(conn).await?;
    match row {
        Some(row) => {
            debug!("🗃️ {} verification #{id} updated: {} after {} retries", row.kind, row.status, row.retries);
            VerificationRecord::try_from(row)
        },
        None => Err(StoreError::RecordNotFound(id)),
    }
}

const CANDIDATE_COLUMNS: &str = "o.id, o.user_id, o.item_id, o.order_type, o.status, o.price, o.currency, o.notes, \
                                 o.counterparty_profile_id, o.seller_profile_id, o.resell, o.created_at, \
                                 o.updated_at, u.id AS u_id, u.profile_id AS u_profile_id, u.name AS u_name, u.status \
                                 AS u_status, u.boons AS u_boons, u.rank_score AS u_rank_score, u.created_at AS \
                                 u_created_at, u.updated_at AS u_updated_at, i.id AS i_id, i.name AS i_name, i.active \
                                 AS i_active, i.created_at AS i_created_at, i.updated_at AS i_updated_at, v.id AS \
                                 v_id, v.order_id AS v_order_id, v.kind AS v_kind, v.status AS v_status, v.assets AS \
                                 v_assets, v.retries AS v_retries, v.created_at AS v_created_at, v.updated_at AS \
                                 v_updated_at";

/// Pages through orders awaiting a verification attempt. See [`CandidateQuery`] for the selection rules.
pub async fn fetch_candidates(
    query: &CandidateQuery,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderDetails>, StoreError> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {CANDIDATE_COLUMNS} FROM orders o LEFT JOIN users u ON u.id = o.user_id LEFT JOIN items i ON i.id = \
         o.item_id LEFT JOIN verifications v ON v.order_id = o.id AND v.kind = "
    ));
    builder.push_bind(query.kind);
    builder.push(" WHERE o.order_type = ");
    builder.push_bind(query.order_type);
    builder.push(" AND o.status = ");
    builder.push_bind(query.order_status);
    if query.statuses.is_empty() {
        builder.push(" AND (v.id IS NULL OR (v.retries <= ");
        builder.push_bind(query.retry_ceiling);
        builder.push(" AND v.status NOT IN (");
        let mut settled = builder.separated(", ");
        for status in query.settled_statuses() {
            settled.push_bind(status);
        }
        builder.push(")))");
    } else {
        builder.push(" AND v.id IS NOT NULL AND v.retries <= ");
        builder.push_bind(query.retry_ceiling);
        builder.push(" AND v.status IN (");
        let mut wanted = builder.separated(", ");
        for status in &query.statuses {
            wanted.push_bind(*status);
        }
        builder.push(")");
    }
    if query.wrapped_only {
        builder.push(
            " AND EXISTS (SELECT 1 FROM json_each(v.assets) a WHERE json_extract(a.value, '$.gift_opened') = 0)",
        );
    }
    if let Some(cursor) = query.after {
        builder.push(" AND (o.updated_at < ");
        builder.push_bind(cursor.updated_at);
        builder.push(" OR (o.updated_at = ");
        builder.push_bind(cursor.updated_at);
        builder.push(" AND o.id < ");
        builder.push_bind(cursor.id);
        builder.push("))");
    }
    builder.push(" ORDER BY o.updated_at DESC, o.id DESC LIMIT ");
    builder.push_bind(query.limit);
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build().fetch_all(conn).await?;
    rows.iter().map(order_details_from_row).collect()
}

fn order_details_from_row(row: &SqliteRow) -> Result<OrderDetails, StoreError> {
    let order = Order::from_row(row)?;
    let owner = match row.try_get::<Option<i64>, _>("u_id")? {
        Some(id) => {
            let boons = row.try_get::<String, _>("u_boons")?;
            Some(User {
                id,
                profile_id: row.try_get("u_profile_id")?,
                name: row.try_get("u_name")?,
                status: row.try_get::<AccountStatus, _>("u_status")?,
                boons: Boons::try_from(boons).map_err(|e| StoreError::InvalidRecord(e.to_string()))?,
                rank_score: row.try_get("u_rank_score")?,
                created_at: row.try_get("u_created_at")?,
                updated_at: row.try_get("u_updated_at")?,
            })
        },
        None => None,
    };
    let item = match row.try_get::<Option<i64>, _>("i_id")? {
        Some(id) => Some(Item {
            id,
            name: row.try_get("i_name")?,
            active: row.try_get("i_active")?,
            created_at: row.try_get("i_created_at")?,
            updated_at: row.try_get("i_updated_at")?,
        }),
        None => None,
    };
    let verification = match row.try_get::<Option<i64>, _>("v_id")? {
        Some(id) => {
            let assets = row.try_get::<String, _>("v_assets")?;
            Some(VerificationRecord {
                id,
                order_id: row.try_get("v_order_id")?,
                kind: row.try_get("v_kind")?,
                status: row.try_get("v_status")?,
                assets: decode_assets(&assets)?,
                retries: row.try_get("v_retries")?,
                created_at: row.try_get("v_created_at")?,
                updated_at: row.try_get("v_updated_at")?,
            })
        },
        None => None,
    };
    Ok(OrderDetails { order, owner, item, verification })
}
