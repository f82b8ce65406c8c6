//! Classifies what an external inventory says about an order.
//!
//! [`verify_delivery`] answers "did the buyer receive the gift from the seller?", [`verify_inventory`] answers "does
//! the seller still hold the item?". Both are pure functions of one inventory fetch; persisting the outcome is the
//! caller's business (see [`crate::VerificationApi`]).
mod checks;
mod inventory;
mod status;

pub use checks::{verify_delivery, verify_inventory, Verification, VerificationError};
pub use inventory::{has_wrapped_gift, Asset, InventoryError, InventorySource};
pub use status::VerificationStatus;
