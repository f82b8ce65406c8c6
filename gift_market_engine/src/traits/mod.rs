//! # Storage contracts
//!
//! This module defines the interface contracts of the gift market storage *backends*. Backends only persist and
//! query; they never make business decisions. Those live in the APIs in [`crate::market_api`].
//!
//! * [`OrderManagement`] stores asks and bids. Writes that must happen together (e.g. retiring old bids when a new
//!   one is placed) are single calls, so that a backend can make them atomic.
//! * [`UserManagement`] gives read access to users and items, plus the rank-score bookkeeping.
//! * [`VerificationManagement`] stores one verification record per order and kind, and answers the composite
//!   "which orders still need verifying" query the verification jobs page through.
//! * [`MarketDatabase`] bundles the three for code that needs all of them.
mod data_objects;
mod errors;
mod market_database;
mod order_management;
mod user_management;
mod verification_management;

pub use data_objects::{
    CandidateQuery,
    InsertGuard,
    InsertedOrder,
    OrderCursor,
    OrderDetails,
    OrderFilter,
    OrderQuery,
    OrderSort,
    Pagination,
    SortDirection,
    SortField,
    VerificationFilter,
};
pub use errors::StoreError;
pub use market_database::MarketDatabase;
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
pub use verification_management::VerificationManagement;
