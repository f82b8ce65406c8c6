//! # Gift market public API
//!
//! * [`market_flow_api`] is the matching service. All changes to asks and bids go through it.
//! * [`verification_api`] records the outcome of inventory and delivery checks.
//!
//! Both APIs are created by supplying a backend that implements the traits in [`crate::traits`], e.g.
//!
//! ```rust,ignore
//! use gift_market_engine::{events::EventProducers, CanonicalProfiles, MarketFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/gift_market.db", 5).await?;
//! let api = MarketFlowApi::new(db, CanonicalProfiles, EventProducers::default());
//! let order = api.create_order(user_id, OrderDraft::ask(item_id, "12.50".parse()?)).await?;
//! ```
pub mod errors;
pub mod market_flow_api;
pub mod order_objects;
pub mod profile_resolver;
pub mod rank_score;
pub mod verification_api;
