use thiserror::Error;

use crate::{
    db_types::{Boon, OrderStatusType, OrderType},
    traits::StoreError,
};

/// Broad error categories, for callers that map errors onto a transport (e.g. HTTP status codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarketApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Item {0} does not exist or is not tradable")]
    ItemNotFound(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("User {user_id} does not own order {order_id}")]
    NotOrderOwner { user_id: i64, order_id: i64 },
    #[error("Account {0} is flagged and cannot trade")]
    AccountFlagged(i64),
    #[error("This action requires the {0} entitlement")]
    MissingEntitlement(Boon),
    #[error("Invalid order: {0}")]
    Validation(String),
    #[error("Live ask limit ({0}) for this item has been reached")]
    AskLimitReached(i64),
    #[error("{order_type} orders cannot move from {from} to {to}")]
    IllegalStatusChange { order_type: OrderType, from: OrderStatusType, to: OrderStatusType },
    #[error("Could not resolve profile {reference}. {reason}")]
    ProfileResolution { reference: String, reason: String },
    #[error("Consistency check failed: {0}")]
    ConsistencyCheckFailed(String),
}

impl MarketApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) | Self::ConsistencyCheckFailed(_) => ErrorKind::Internal,
            Self::OrderNotFound(_) | Self::ItemNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::NotOrderOwner { .. } | Self::AccountFlagged(_) | Self::MissingEntitlement(_) => {
                ErrorKind::Authorization
            },
            Self::Validation(_) | Self::AskLimitReached(_) | Self::IllegalStatusChange { .. } => ErrorKind::Validation,
            Self::ProfileResolution { .. } => ErrorKind::Upstream,
        }
    }
}

impl From<StoreError> for MarketApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            StoreError::ItemNotFound(id) => Self::ItemNotFound(id),
            StoreError::UserNotFound(id) => Self::UserNotFound(id),
            StoreError::LiveLimitReached(limit) => Self::AskLimitReached(limit),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
}

impl From<StoreError> for VerificationApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn store_errors_keep_their_category() {
        assert_eq!(MarketApiError::from(StoreError::OrderNotFound(4)).kind(), ErrorKind::NotFound);
        assert_eq!(MarketApiError::from(StoreError::DatabaseError("boom".into())).kind(), ErrorKind::Internal);
        assert_eq!(MarketApiError::AccountFlagged(1).kind(), ErrorKind::Authorization);
        assert_eq!(MarketApiError::AskLimitReached(5).kind(), ErrorKind::Validation);
        assert_eq!(MarketApiError::from(StoreError::LiveLimitReached(5)), MarketApiError::AskLimitReached(5));
    }
}
