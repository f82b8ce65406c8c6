use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use gift_common::Price;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use crate::verification::{Asset, VerificationStatus};
use crate::verification::has_wrapped_gift;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      OrderType        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderType {
    /// An offer to sell an item
    Ask,
    /// A request to buy an item
    Bid,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Ask => write!(f, "Ask"),
            OrderType::Bid => write!(f, "Bid"),
        }
    }
}

impl FromStr for OrderType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ask" => Ok(Self::Ask),
            "Bid" => Ok(Self::Bid),
            s => Err(ConversionError(format!("Invalid order type: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order is visible on the market.
    Live,
    /// A buyer has been found for the ask and the seller is about to deliver.
    Reserved,
    /// The seller has delivered the item.
    Sold,
    /// The bid was filled by a seller.
    BidCompleted,
    /// The owner withdrew the order.
    Cancelled,
    /// The order was retired by the system, e.g. because it was superseded by a newer bid.
    Removed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sold | Self::BidCompleted | Self::Cancelled | Self::Removed)
    }

    /// The statuses an order of the given type may move to from this one.
    pub fn next_statuses(&self, order_type: OrderType) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match (order_type, self) {
            (OrderType::Ask, Live) => &[Reserved, Sold, Cancelled, Removed],
            (OrderType::Ask, Reserved) => &[Live, Sold, Cancelled],
            (OrderType::Bid, Live) => &[BidCompleted, Cancelled, Removed],
            _ => &[],
        }
    }

    /// Whether `self -> next` is legal for the order type. Staying in the same status is always allowed.
    pub fn can_become(&self, next: OrderStatusType, order_type: OrderType) -> bool {
        *self == next || self.next_statuses(order_type).contains(&next)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Live => write!(f, "Live"),
            OrderStatusType::Reserved => write!(f, "Reserved"),
            OrderStatusType::Sold => write!(f, "Sold"),
            OrderStatusType::BidCompleted => write!(f, "BidCompleted"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Removed => write!(f, "Removed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Live" => Ok(Self::Live),
            "Reserved" => Ok(Self::Reserved),
            "Sold" => Ok(Self::Sold),
            "BidCompleted" => Ok(Self::BidCompleted),
            "Cancelled" => Ok(Self::Cancelled),
            "Removed" => Ok(Self::Removed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    AccountStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Active,
    /// Under review. Flagged accounts cannot trade.
    Flagged,
    Banned,
}

impl AccountStatus {
    pub fn can_trade(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "Active"),
            AccountStatus::Flagged => write!(f, "Flagged"),
            AccountStatus::Banned => write!(f, "Banned"),
        }
    }
}

//--------------------------------------        Boons          ---------------------------------------------------------
/// Paid entitlements attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boon {
    /// Raises the live-ask ceiling per item.
    RefresherOrb,
    /// Allows listing on behalf of another (reseller proxy) profile.
    ShopkeepersContract,
}

impl Display for Boon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Boon::RefresherOrb => write!(f, "RefresherOrb"),
            Boon::ShopkeepersContract => write!(f, "ShopkeepersContract"),
        }
    }
}

impl FromStr for Boon {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RefresherOrb" => Ok(Self::RefresherOrb),
            "ShopkeepersContract" => Ok(Self::ShopkeepersContract),
            s => Err(ConversionError(format!("Invalid boon: {s}"))),
        }
    }
}

/// Stored as a comma-separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boons(Vec<Boon>);

impl Boons {
    pub fn new(boons: Vec<Boon>) -> Self {
        Self(boons)
    }

    pub fn contains(&self, boon: Boon) -> bool {
        self.0.contains(&boon)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for Boons {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.split(',').filter(|s| !s.trim().is_empty()).map(Boon::from_str).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

impl Display for Boons {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.0.iter().map(|b| b.to_string()).collect::<Vec<String>>();
        write!(f, "{}", names.join(","))
    }
}

//--------------------------------------     TaskPriority      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Normal,
    High,
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Canonical id of the user's Steam profile.
    pub profile_id: String,
    /// The persona name the user trades under. Gifts sent by this user carry it.
    pub name: String,
    pub status: AccountStatus,
    #[sqlx(try_from = "String")]
    pub boons: Boons,
    pub rank_score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_boon(&self, boon: Boon) -> bool {
        self.boons.contains(boon)
    }

    /// Priority of verification work queued on behalf of this user.
    pub fn task_priority(&self) -> TaskPriority {
        if !self.boons.is_empty() {
            TaskPriority::High
        } else if self.rank_score > 0 {
            TaskPriority::Normal
        } else {
            TaskPriority::Low
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub profile_id: String,
    pub name: String,
    pub status: AccountStatus,
    pub boons: Boons,
}

impl NewUser {
    pub fn new<S1: Into<String>, S2: Into<String>>(profile_id: S1, name: S2) -> Self {
        Self { profile_id: profile_id.into(), name: name.into(), ..Default::default() }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_boon(mut self, boon: Boon) -> Self {
        self.boons.0.push(boon);
        self
    }
}

//--------------------------------------         Item          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    /// Must match the in-game item name exactly; inventory checks compare against it.
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub active: bool,
}

impl NewItem {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), active: true }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub order_type: OrderType,
    pub status: OrderStatusType,
    pub price: Price,
    pub currency: String,
    pub notes: String,
    /// The buyer of an ask, or the seller who filled a bid.
    pub counterparty_profile_id: Option<String>,
    /// Profile actually holding the item when the ask is listed under a reseller contract.
    pub seller_profile_id: Option<String>,
    pub resell: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_ask(&self) -> bool {
        self.order_type == OrderType::Ask
    }

    pub fn is_bid(&self) -> bool {
        self.order_type == OrderType::Bid
    }

    /// The profile whose inventory should hold the item of an ask.
    pub fn inventory_profile_id<'a>(&'a self, owner: &'a User) -> &'a str {
        self.seller_profile_id.as_deref().unwrap_or(owner.profile_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: i64,
    pub item_id: i64,
    pub order_type: OrderType,
    pub status: OrderStatusType,
    pub price: Price,
    pub currency: String,
    pub notes: String,
    pub counterparty_profile_id: Option<String>,
    pub seller_profile_id: Option<String>,
    pub resell: bool,
}

/// The mutable subset of an order. Owner, item, price and currency cannot be changed once an order exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: i64,
    pub status: Option<OrderStatusType>,
    pub notes: Option<String>,
    pub counterparty_profile_id: Option<String>,
}

impl OrderUpdate {
    pub fn new(id: i64) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_counterparty<S: Into<String>>(mut self, profile_id: S) -> Self {
        self.counterparty_profile_id = Some(profile_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.counterparty_profile_id.is_none()
    }
}

//--------------------------------------  OrderStatusCounts    ---------------------------------------------------------
/// Number of orders a user has in each status. Feeds the rank score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusCounts {
    pub live: i64,
    pub reserved: i64,
    pub sold: i64,
    pub bid_completed: i64,
    pub cancelled: i64,
    pub removed: i64,
}

impl OrderStatusCounts {
    pub fn add(&mut self, status: OrderStatusType, count: i64) {
        match status {
            OrderStatusType::Live => self.live += count,
            OrderStatusType::Reserved => self.reserved += count,
            OrderStatusType::Sold => self.sold += count,
            OrderStatusType::BidCompleted => self.bid_completed += count,
            OrderStatusType::Cancelled => self.cancelled += count,
            OrderStatusType::Removed => self.removed += count,
        }
    }
}

//--------------------------------------   VerificationKind    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum VerificationKind {
    /// The seller still holds the item of a live or reserved ask.
    Inventory,
    /// The buyer received the item of a sold ask.
    Delivery,
}

impl VerificationKind {
    /// A result of at least this status ends automatic verification for the order.
    pub fn settled_status(&self) -> VerificationStatus {
        match self {
            VerificationKind::Inventory => VerificationStatus::NameVerified,
            VerificationKind::Delivery => VerificationStatus::SenderVerified,
        }
    }

    pub fn is_settled(&self, status: VerificationStatus) -> bool {
        status >= self.settled_status()
    }

    /// Whether an attempt with this outcome ends verification for good. A delivery whose gift is still wrapped keeps
    /// counting retries until the buyer opens it.
    pub fn is_final(&self, status: VerificationStatus, assets: &[Asset]) -> bool {
        match self {
            VerificationKind::Inventory => self.is_settled(status),
            VerificationKind::Delivery => self.is_settled(status) && !has_wrapped_gift(assets),
        }
    }
}

impl Display for VerificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationKind::Inventory => write!(f, "Inventory"),
            VerificationKind::Delivery => write!(f, "Delivery"),
        }
    }
}

//--------------------------------------  VerificationRecord   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: i64,
    pub order_id: i64,
    pub kind: VerificationKind,
    pub status: VerificationStatus,
    /// The inventory entries that matched the item name on the last attempt.
    pub assets: Vec<Asset>,
    pub retries: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// The sender is confirmed but the buyer has not unwrapped the gift yet.
    pub fn gift_unopened(&self) -> bool {
        self.status == VerificationStatus::SenderVerified && has_wrapped_gift(&self.assets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVerification {
    pub order_id: i64,
    pub kind: VerificationKind,
    pub status: VerificationStatus,
    pub assets: Vec<Asset>,
    pub retries: i64,
}

/// One attempt's worth of changes to a stored verification record. The retry counter is incremented by the store, so
/// concurrent attempts never lose a count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationUpdate {
    /// Added to the stored retry counter.
    pub retry_increment: i64,
    /// Replacement status. `None` keeps the stored status and assets.
    pub status: Option<VerificationStatus>,
    pub assets: Vec<Asset>,
    /// When set, status and assets are only replaced while the stored status still equals this one.
    pub expected_status: Option<VerificationStatus>,
}

impl VerificationUpdate {
    pub fn new(retry_increment: i64) -> Self {
        Self { retry_increment, status: None, assets: Vec::new(), expected_status: None }
    }

    pub fn with_result(mut self, status: VerificationStatus, assets: Vec<Asset>) -> Self {
        self.status = Some(status);
        self.assets = assets;
        self
    }

    pub fn if_status(mut self, expected: VerificationStatus) -> Self {
        self.expected_status = Some(expected);
        self
    }
}
