use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{
    ConversionError,
    Item,
    Order,
    OrderStatusType,
    OrderType,
    User,
    VerificationKind,
    VerificationRecord,
    VerificationStatus,
};

//--------------------------------------      Sorting          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Price,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort order of an order listing. Parses from and prints as `field:direction`, e.g. `updated_at:desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for OrderSort {
    fn default() -> Self {
        Self { field: SortField::UpdatedAt, direction: SortDirection::Desc }
    }
}

impl FromStr for OrderSort {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s.split_once(':').unwrap_or((s, "asc"));
        let field = match field.trim().to_ascii_lowercase().as_str() {
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            "price" => SortField::Price,
            f => return Err(ConversionError(format!("Cannot sort orders by {f}"))),
        };
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            d => return Err(ConversionError(format!("Invalid sort direction: {d}"))),
        };
        Ok(Self { field, direction })
    }
}

impl Display for OrderSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.field.column(), self.direction.keyword().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn next(&self) -> Self {
        Self { limit: self.limit, offset: self.offset + self.limit }
    }
}

//--------------------------------------     InsertGuard       ---------------------------------------------------------
/// Checks and side effects that a store applies in the same transaction as an order insert. Both work on the owner's
/// live orders of the new order's type on the same item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertGuard {
    /// Refuse the insert with [`crate::traits::StoreError::LiveLimitReached`] once this many live orders exist.
    pub live_limit: Option<i64>,
    /// Move the existing live orders to `Removed`.
    pub retire_live: bool,
}

impl InsertGuard {
    pub fn with_live_limit(mut self, limit: i64) -> Self {
        self.live_limit = Some(limit);
        self
    }

    pub fn retiring_live(mut self) -> Self {
        self.retire_live = true;
        self
    }
}

/// A freshly stored order, with the orders it retired as they are now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedOrder {
    pub order: Order,
    pub retired: Vec<Order>,
}

//--------------------------------------     OrderFilter       ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub item_id: Option<i64>,
    pub order_type: Option<OrderType>,
    pub statuses: Vec<OrderStatusType>,
    pub counterparty_profile_id: Option<String>,
}

impl OrderFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_item_id(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub fn with_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_counterparty<S: Into<String>>(mut self, profile_id: S) -> Self {
        self.counterparty_profile_id = Some(profile_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.item_id.is_none() &&
            self.order_type.is_none() &&
            self.statuses.is_empty() &&
            self.counterparty_profile_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub filter: OrderFilter,
    pub sort: OrderSort,
    /// `None` returns every matching order.
    pub page: Option<Pagination>,
}

impl OrderQuery {
    pub fn new(filter: OrderFilter) -> Self {
        Self { filter, ..Default::default() }
    }

    pub fn sorted_by(mut self, sort: OrderSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn paged(mut self, page: Pagination) -> Self {
        self.page = Some(page);
        self
    }
}

//--------------------------------------    OrderDetails       ---------------------------------------------------------
/// An order with its owner, item and (for candidate queries) verification record attached. Any of the references can
/// be missing if the store no longer holds the referenced row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: Order,
    pub owner: Option<User>,
    pub item: Option<Item>,
    pub verification: Option<VerificationRecord>,
}

impl OrderDetails {
    pub fn new(order: Order) -> Self {
        Self { order, owner: None, item: None, verification: None }
    }

    pub fn with_owner(mut self, owner: User) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_verification(mut self, record: VerificationRecord) -> Self {
        self.verification = Some(record);
        self
    }

    pub fn cursor(&self) -> OrderCursor {
        OrderCursor { updated_at: self.order.updated_at, id: self.order.id }
    }
}

/// Keyset position in a most-recently-updated-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCursor {
    pub updated_at: DateTime<Utc>,
    pub id: i64,
}

//--------------------------------------   CandidateQuery      ---------------------------------------------------------
/// Selects orders that still need a verification attempt of the given kind.
///
/// An order qualifies if it has the given type and status and
/// * when `statuses` is empty: it has no record of this kind yet, or its record is not settled for the kind;
/// * otherwise: it has a record whose status is one of `statuses`;
///
/// and, in both cases, the record (if any) has no more than `retry_ceiling` retries. With `wrapped_only` set, the
/// record must also hold at least one asset that is still gift-wrapped.
///
/// Results are ordered by `updated_at` descending, then `id` descending, and start strictly after `after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub kind: VerificationKind,
    pub order_type: OrderType,
    pub order_status: OrderStatusType,
    pub statuses: Vec<VerificationStatus>,
    pub retry_ceiling: i64,
    pub wrapped_only: bool,
    pub limit: i64,
    pub after: Option<OrderCursor>,
}

impl CandidateQuery {
    pub fn new(kind: VerificationKind, order_type: OrderType, order_status: OrderStatusType) -> Self {
        Self {
            kind,
            order_type,
            order_status,
            statuses: Vec::new(),
            retry_ceiling: crate::MAX_VERIFICATION_RETRIES,
            wrapped_only: false,
            limit: 10,
            after: None,
        }
    }

    pub fn with_statuses(mut self, statuses: Vec<VerificationStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_retry_ceiling(mut self, ceiling: i64) -> Self {
        self.retry_ceiling = ceiling;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn wrapped_gifts_only(mut self) -> Self {
        self.wrapped_only = true;
        self
    }

    pub fn after(mut self, cursor: OrderCursor) -> Self {
        self.after = Some(cursor);
        self
    }

    /// Statuses that, once recorded, take an order out of the default candidate set.
    pub fn settled_statuses(&self) -> Vec<VerificationStatus> {
        [VerificationStatus::NameVerified, VerificationStatus::SenderVerified]
            .into_iter()
            .filter(|s| self.kind.is_settled(*s))
            .collect()
    }
}

//--------------------------------------  VerificationFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationFilter {
    pub order_id: Option<i64>,
    pub kind: Option<VerificationKind>,
    pub statuses: Vec<VerificationStatus>,
    pub max_retries: Option<i64>,
}

impl VerificationFilter {
    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_kind(mut self, kind: VerificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_max_retries(mut self, retries: i64) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.kind.is_none() && self.statuses.is_empty() && self.max_retries.is_none()
    }
}
