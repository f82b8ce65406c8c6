use thiserror::Error;

use crate::db_types::VerificationKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("The requested item {0} does not exist")]
    ItemNotFound(i64),
    #[error("There is no {1} verification record for order {0}")]
    VerificationNotFound(i64, VerificationKind),
    #[error("The requested verification record {0} does not exist")]
    RecordNotFound(i64),
    #[error("A record with the same unique key already exists. {0}")]
    Duplicate(String),
    #[error("The owner already holds the maximum of {0} live orders of this type on the item")]
    LiveLimitReached(i64),
    #[error("A stored record could not be decoded. {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::OrderNotFound(_) |
                Self::UserNotFound(_) |
                Self::ItemNotFound(_) |
                Self::VerificationNotFound(..) |
                Self::RecordNotFound(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate(db.to_string()),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
