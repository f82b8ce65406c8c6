//! Gift Market Engine
//!
//! The engine runs a peer-to-peer market for gifted in-game items. Sellers list asks, buyers list bids, and trades
//! settle off-platform when the seller gifts the item to the buyer. The engine's job is to keep the order book
//! consistent and to confirm, by reading public inventories, that items are where they should be.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend, [`SqliteDatabase`]). Backends only persist; they make no
//!    business decisions. The data types they exchange live in [`mod@db_types`].
//! 2. The public API ([`MarketFlowApi`] for the order life cycle and [`VerificationApi`] for recording verification
//!    results).
//! 3. The verification functions ([`mod@verification`]), which classify what an inventory says about an order.
//! 4. Background work: a small scheduler ([`mod@worker`]) and the recurring verification jobs ([`mod@jobs`]).
//!
//! The engine also emits events ([`mod@events`]) when orders change or need verifying out of band.
mod db;

pub mod db_types;
pub mod events;
pub mod jobs;
mod market_api;
pub mod traits;
pub mod verification;
pub mod worker;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

/// Verification records with more retries than this are no longer picked up by the jobs.
pub const MAX_VERIFICATION_RETRIES: i64 = 10;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use market_api::{
    errors::{ErrorKind, MarketApiError, VerificationApiError},
    market_flow_api::MarketFlowApi,
    order_objects,
    order_objects::{MarketLimits, OrderDraft, OrderPatch},
    profile_resolver::{CanonicalProfiles, ProfileResolutionError, ProfileResolver},
    rank_score::rank_score,
    verification_api::{StatusPolicy, VerificationApi},
};
