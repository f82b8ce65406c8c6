//! SQLite backend for the gift market.
//!
//! The submodules hold one file of plain query functions per table. They take a `&mut SqliteConnection` so that
//! [`SqliteDatabase`] can run several of them inside one transaction.
mod sqlite_impl;

pub mod orders;
pub mod users;
pub mod verifications;

use std::{env, str::FromStr};

use log::{info, warn};
pub use sqlite_impl::SqliteDatabase;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection,
    SqlitePool,
};

use crate::traits::StoreError;

const SQLITE_DB_URL: &str = "sqlite://data/gift_market.db";

pub fn db_url() -> String {
    let result = env::var("GMX_DATABASE_URL").unwrap_or_else(|_| {
        info!("GMX_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Opens a transaction that takes the write lock straight away, so reads made inside it stay valid until commit.
pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

/// Ends a transaction opened with [`begin_immediate`]: commits if `result` is a success and rolls back otherwise.
pub(crate) async fn end_transaction<T>(
    result: Result<T, StoreError>,
    conn: &mut SqliteConnection,
) -> Result<T, StoreError> {
    let outcome = match result {
        Ok(value) => sqlx::query("COMMIT").execute(&mut *conn).await.map(|_| value).map_err(StoreError::from),
        Err(e) => Err(e),
    };
    if outcome.is_err() {
        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            warn!("🗃️ Could not roll back the transaction. {e}");
        }
    }
    outcome
}
