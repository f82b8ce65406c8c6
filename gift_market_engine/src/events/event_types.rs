use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, TaskPriority, VerificationKind},
    traits::OrderDetails,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderChange {
    Created,
    Updated,
    /// Moved to `Removed` by the system.
    Retired,
}

/// Something about an order changed. Listeners use this to refresh search indices and other projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChangedEvent {
    pub order: Order,
    pub change: OrderChange,
}

impl OrderChangedEvent {
    pub fn new(order: Order, change: OrderChange) -> Self {
        Self { order, change }
    }
}

/// An order should be verified out of band, ahead of the next scheduled job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationTaskEvent {
    /// The order with its owner and item attached.
    pub details: OrderDetails,
    pub kind: VerificationKind,
    pub priority: TaskPriority,
}

impl VerificationTaskEvent {
    pub fn new(details: OrderDetails, kind: VerificationKind, priority: TaskPriority) -> Self {
        Self { details, kind, priority }
    }
}
