use gift_common::{Price, DEFAULT_CURRENCY_CODE};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Boon, NewOrder, OrderStatusType, OrderType, User},
    market_api::errors::MarketApiError,
};

const CURRENCY_PATTERN: &str = r"^[A-Z]{3}$";

/// A request to list a new ask or bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub item_id: i64,
    pub price: Price,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub notes: String,
    /// Profile reference (id, vanity name or profile URL) of the account actually holding the item. Only asks listed
    /// under a reseller contract carry one.
    #[serde(default)]
    pub seller_profile: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY_CODE.to_string()
}

impl OrderDraft {
    pub fn ask(item_id: i64, price: Price) -> Self {
        Self::new(OrderType::Ask, item_id, price)
    }

    pub fn bid(item_id: i64, price: Price) -> Self {
        Self::new(OrderType::Bid, item_id, price)
    }

    pub fn new(order_type: OrderType, item_id: i64, price: Price) -> Self {
        Self { order_type, item_id, price, currency: default_currency(), notes: String::new(), seller_profile: None }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_seller_profile<S: Into<String>>(mut self, profile: S) -> Self {
        self.seller_profile = Some(profile.into());
        self
    }

    pub fn validate(&self) -> Result<(), MarketApiError> {
        if !self.price.is_positive() {
            return Err(MarketApiError::Validation(format!("Price must be positive, not {}", self.price)));
        }
        if self.currency.trim().is_empty() {
            return Err(MarketApiError::Validation("Currency is required".into()));
        }
        let valid_code = Regex::new(CURRENCY_PATTERN).map(|re| re.is_match(&self.currency)).unwrap_or(false);
        if !valid_code {
            return Err(MarketApiError::Validation(format!("{} is not a currency code", self.currency)));
        }
        if self.order_type == OrderType::Bid && self.seller_profile.is_some() {
            return Err(MarketApiError::Validation("Only asks can be listed for a reseller".into()));
        }
        if matches!(&self.seller_profile, Some(p) if p.trim().is_empty()) {
            return Err(MarketApiError::Validation("Seller profile is empty".into()));
        }
        Ok(())
    }

    /// The order as it will be stored. `seller_profile_id` must already be resolved.
    pub fn into_new_order(self, user_id: i64, seller_profile_id: Option<String>) -> NewOrder {
        NewOrder {
            user_id,
            item_id: self.item_id,
            order_type: self.order_type,
            status: OrderStatusType::Live,
            price: self.price,
            currency: self.currency,
            notes: self.notes.trim().to_string(),
            resell: seller_profile_id.is_some(),
            counterparty_profile_id: None,
            seller_profile_id,
        }
    }
}

/// Changes requested to an existing order.
///
/// Owner, item, price and currency are accepted so that whole-order payloads can be submitted, but they are dropped by
/// [`OrderPatch::strip_immutable`] before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatusType>,
    /// Appended to the existing notes.
    pub notes: Option<String>,
    /// Profile reference of the buyer of an ask or the seller filling a bid.
    pub counterparty: Option<String>,
    pub user_id: Option<i64>,
    pub item_id: Option<i64>,
    pub price: Option<Price>,
    pub currency: Option<String>,
}

impl OrderPatch {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_counterparty<S: Into<String>>(mut self, profile: S) -> Self {
        self.counterparty = Some(profile.into());
        self
    }

    pub fn has_immutable_fields(&self) -> bool {
        self.user_id.is_some() || self.item_id.is_some() || self.price.is_some() || self.currency.is_some()
    }

    pub fn strip_immutable(mut self) -> Self {
        self.user_id = None;
        self.item_id = None;
        self.price = None;
        self.currency = None;
        self
    }
}

/// Per-item ceilings on the number of live asks a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLimits {
    pub base_ask_limit: i64,
    /// Applies to holders of [`Boon::RefresherOrb`].
    pub premium_ask_limit: i64,
}

impl Default for MarketLimits {
    fn default() -> Self {
        Self { base_ask_limit: 5, premium_ask_limit: 25 }
    }
}

impl MarketLimits {
    pub fn ask_limit_for(&self, user: &User) -> i64 {
        if user.has_boon(Boon::RefresherOrb) {
            self.premium_ask_limit
        } else {
            self.base_ask_limit
        }
    }
}
