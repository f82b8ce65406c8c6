use std::fmt::Debug;

use gift_common::helpers::append_text;
use log::*;

use crate::{
    db_types::{
        Boon,
        Item,
        Order,
        OrderStatusType,
        OrderType,
        OrderUpdate,
        User,
        VerificationKind,
        VerificationStatus,
    },
    events::{EventProducers, OrderChange, OrderChangedEvent, VerificationTaskEvent},
    market_api::{
        errors::MarketApiError,
        order_objects::{MarketLimits, OrderDraft, OrderPatch},
        profile_resolver::ProfileResolver,
        rank_score::rank_score,
        verification_api::VerificationApi,
    },
    traits::{InsertGuard, InsertedOrder, MarketDatabase, OrderDetails, OrderFilter, OrderQuery},
};

/// `MarketFlowApi` is the matching service. It owns the life cycle of asks and bids: listing, reserving, selling,
/// cancelling, and the automatic completion of a buyer's bid when a seller reserves an ask for them.
///
/// Every successful write is followed by a rank score refresh for the affected users, an [`OrderChangedEvent`] per
/// changed order and, for asks, a [`VerificationTaskEvent`] when the new state calls for an inventory or delivery
/// check.
pub struct MarketFlowApi<B, R> {
    db: B,
    resolver: R,
    producers: EventProducers,
    limits: MarketLimits,
}

impl<B, R> Debug for MarketFlowApi<B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarketFlowApi ({:?})", self.limits)
    }
}

impl<B, R> MarketFlowApi<B, R> {
    pub fn new(db: B, resolver: R, producers: EventProducers) -> Self {
        Self { db, resolver, producers, limits: MarketLimits::default() }
    }

    pub fn with_limits(mut self, limits: MarketLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> MarketLimits {
        self.limits
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, R> MarketFlowApi<B, R>
where
    B: MarketDatabase,
    R: ProfileResolver,
{
    /// Lists a new ask or bid on behalf of `user_id`.
    ///
    /// * The user must exist and be allowed to trade, and the item must exist and be active.
    /// * An ask is refused once the user holds the maximum number of live asks for the item. If the draft names a
    ///   seller profile, the user needs a [`Boon::ShopkeepersContract`]; the ask is then flagged for resale and its
    ///   inventory is considered verified up front.
    /// * A bid replaces any live bid the user already has on the item. The old bids are moved to `Removed` in the same
    ///   transaction that stores the new one.
    pub async fn create_order(&self, user_id: i64, draft: OrderDraft) -> Result<Order, MarketApiError> {
        let user = self.fetch_trader(user_id).await?;
        draft.validate()?;
        let item = self.fetch_active_item(draft.item_id).await?;
        let inserted = match draft.order_type {
            OrderType::Ask => {
                let seller_profile_id = match draft.seller_profile.as_deref() {
                    Some(reference) => {
                        if !user.has_boon(Boon::ShopkeepersContract) {
                            return Err(MarketApiError::MissingEntitlement(Boon::ShopkeepersContract));
                        }
                        Some(self.resolve_profile(reference).await?)
                    },
                    None => None,
                };
                let guard = InsertGuard::default().with_live_limit(self.limits.ask_limit_for(&user));
                self.db.insert_order(draft.into_new_order(user.id, seller_profile_id), guard).await?
            },
            OrderType::Bid => {
                let guard = InsertGuard::default().retiring_live();
                self.db.insert_order(draft.into_new_order(user.id, None), guard).await?
            },
        };
        let InsertedOrder { order, retired } = inserted;
        if !retired.is_empty() {
            let ids = retired.iter().map(|o| o.id).collect::<Vec<i64>>();
            debug!("🛒️ New bid #{} from user #{} on item #{} replaces bids {ids:?}", order.id, user.id, item.id);
        }
        info!(
            "🛒️ {} #{} for {} at {} {} listed by user #{}",
            order.order_type, order.id, item.name, order.price, order.currency, user.id
        );
        if order.resell {
            self.seed_reseller_verification(&order).await;
        }
        self.refresh_rank_score(user.id).await;
        for old in retired {
            self.producers.publish_order_changed(OrderChangedEvent::new(old, OrderChange::Retired)).await;
        }
        self.producers.publish_order_changed(OrderChangedEvent::new(order.clone(), OrderChange::Created)).await;
        if order.is_ask() {
            let priority = user.task_priority();
            let details = OrderDetails::new(order.clone()).with_owner(user).with_item(item);
            let event = VerificationTaskEvent::new(details, VerificationKind::Inventory, priority);
            self.producers.publish_verification_task(event).await;
        }
        Ok(order)
    }

    /// Applies the owner's changes to an order.
    ///
    /// Owner, item, price and currency in the patch are ignored. Notes are appended to the existing notes. The status
    /// may only move along the order type's transition table. A counterparty reference is resolved to a canonical
    /// profile id before it is stored.
    ///
    /// When an ask moves into `Reserved` for a counterparty, that buyer's live bid on the item (if there is one) is
    /// completed in the same transaction. Patches that leave the status where it is trigger neither bid completion nor
    /// a verification task.
    pub async fn update_order(&self, user_id: i64, order_id: i64, patch: OrderPatch) -> Result<Order, MarketApiError> {
        let current = self.db.fetch_order(order_id).await?;
        if current.user_id != user_id {
            return Err(MarketApiError::NotOrderOwner { user_id, order_id });
        }
        let owner = self.fetch_trader(current.user_id).await?;
        if patch.has_immutable_fields() {
            debug!("🛒️ Ignoring immutable fields in the update for order {order_id}");
        }
        let patch = patch.strip_immutable();
        let next_status = patch.status.unwrap_or(current.status);
        if !current.status.can_become(next_status, current.order_type) {
            return Err(MarketApiError::IllegalStatusChange {
                order_type: current.order_type,
                from: current.status,
                to: next_status,
            });
        }
        if current.is_ask() && next_status == OrderStatusType::Live && current.status != OrderStatusType::Live {
            self.check_ask_limit(&owner, current.item_id).await?;
        }
        let counterparty = match patch.counterparty.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(reference) => Some(self.resolve_profile(reference).await?),
            None => None,
        };

        let mut update = OrderUpdate::new(current.id);
        update.status = patch.status;
        update.notes = patch.notes.as_deref().map(|n| append_text(&current.notes, n));
        update.counterparty_profile_id = counterparty.clone();
        let mut updates = vec![update];
        let entering = patch.status.filter(|s| *s != current.status);
        if current.is_ask() && entering == Some(OrderStatusType::Reserved) {
            let buyer = counterparty.as_deref().or(current.counterparty_profile_id.as_deref());
            if let Some(buyer) = buyer {
                if let Some(bid_update) = self.plan_bid_completion(&current, &owner, buyer).await? {
                    updates.push(bid_update);
                }
            }
        }

        let mut changed = self.db.update_orders(&updates).await?;
        if changed.is_empty() {
            return Err(MarketApiError::OrderNotFound(order_id));
        }
        let order = changed.remove(0);
        info!("🛒️ {} #{} updated. Status: {} -> {}", order.order_type, order.id, current.status, order.status);
        self.refresh_rank_score(owner.id).await;
        for bid in &changed {
            info!("🛒️ Bid #{} completed by reservation of ask #{}", bid.id, order.id);
            self.refresh_rank_score(bid.user_id).await;
        }
        self.producers.publish_order_changed(OrderChangedEvent::new(order.clone(), OrderChange::Updated)).await;
        for bid in changed {
            self.producers.publish_order_changed(OrderChangedEvent::new(bid, OrderChange::Updated)).await;
        }
        if order.is_ask() {
            let kind = match entering {
                Some(OrderStatusType::Reserved) => Some(VerificationKind::Inventory),
                Some(OrderStatusType::Sold) => Some(VerificationKind::Delivery),
                _ => None,
            };
            if let Some(kind) = kind {
                self.queue_verification(&order, owner, kind).await;
            }
        }
        Ok(order)
    }

    /// Withdraws an order. Shorthand for an update to `Cancelled`.
    pub async fn cancel_order(
        &self,
        user_id: i64,
        order_id: i64,
        notes: Option<&str>,
    ) -> Result<Order, MarketApiError> {
        let mut patch = OrderPatch::default().with_status(OrderStatusType::Cancelled);
        patch.notes = notes.map(String::from);
        self.update_order(user_id, order_id, patch).await
    }

    /// Completes the counterparty's live bid on the ask's item, stamping the seller's profile id on it.
    ///
    /// Returns `None` if the counterparty is not a market user or has no live bid on the item. More than one live bid
    /// means the one-live-bid-per-item rule has been broken and is reported as
    /// [`MarketApiError::ConsistencyCheckFailed`].
    pub async fn auto_complete_bid(
        &self,
        ask: &Order,
        counterparty_profile_id: &str,
    ) -> Result<Option<Order>, MarketApiError> {
        let seller = self.db.fetch_user(ask.user_id).await?;
        let Some(update) = self.plan_bid_completion(ask, &seller, counterparty_profile_id).await? else {
            return Ok(None);
        };
        let bid = self.db.update_orders(&[update]).await?.pop();
        if let Some(bid) = &bid {
            info!("🛒️ Bid #{} completed by ask #{}", bid.id, ask.id);
            self.refresh_rank_score(bid.user_id).await;
            self.producers.publish_order_changed(OrderChangedEvent::new(bid.clone(), OrderChange::Updated)).await;
        }
        Ok(bid)
    }

    async fn plan_bid_completion(
        &self,
        ask: &Order,
        seller: &User,
        counterparty_profile_id: &str,
    ) -> Result<Option<OrderUpdate>, MarketApiError> {
        let Some(buyer) = self.db.fetch_user_by_profile_id(counterparty_profile_id).await? else {
            debug!("🛒️ {counterparty_profile_id} is not a market user. No bid to complete for ask #{}", ask.id);
            return Ok(None);
        };
        let filter = OrderFilter::default()
            .with_user_id(buyer.id)
            .with_item_id(ask.item_id)
            .with_type(OrderType::Bid)
            .with_status(OrderStatusType::Live);
        let mut bids = self.db.fetch_orders(&OrderQuery::new(filter)).await?;
        match bids.len() {
            0 => {
                debug!("🛒️ User #{} has no live bid on item #{}", buyer.id, ask.item_id);
                Ok(None)
            },
            1 => {
                let bid = bids.remove(0);
                let update = OrderUpdate::new(bid.id)
                    .with_status(OrderStatusType::BidCompleted)
                    .with_counterparty(seller.profile_id.clone());
                Ok(Some(update))
            },
            n => {
                error!(
                    "🛒️ User #{} has {n} live bids on item #{}. There should never be more than one.",
                    buyer.id, ask.item_id
                );
                Err(MarketApiError::ConsistencyCheckFailed(format!(
                    "User #{} has {n} live bids on item #{}",
                    buyer.id, ask.item_id
                )))
            },
        }
    }

    /// Recalculates and stores the user's rank score from their current order counts. Safe to call at any time.
    pub async fn recompute_rank_score(&self, user_id: i64) -> Result<User, MarketApiError> {
        let counts = self.db.order_status_counts(user_id).await?;
        let score = rank_score(&counts);
        let user = self.db.update_rank_score(user_id, score).await?;
        trace!("🛒️ Rank score for user #{user_id} is now {score}");
        Ok(user)
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Order, MarketApiError> {
        let order = self.db.fetch_order(order_id).await?;
        Ok(order)
    }

    pub async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, MarketApiError> {
        let orders = self.db.fetch_orders(query).await?;
        Ok(orders)
    }

    pub async fn count_orders(&self, filter: &OrderFilter) -> Result<i64, MarketApiError> {
        let count = self.db.count_orders(filter).await?;
        Ok(count)
    }

    async fn refresh_rank_score(&self, user_id: i64) {
        if let Err(e) = self.recompute_rank_score(user_id).await {
            error!("🛒️ Could not update the rank score for user #{user_id}. {e}");
        }
    }

    async fn fetch_trader(&self, user_id: i64) -> Result<User, MarketApiError> {
        let user = self.db.fetch_user(user_id).await?;
        if !user.status.can_trade() {
            warn!("🛒️ User #{user_id} tried to trade but the account is {}", user.status);
            return Err(MarketApiError::AccountFlagged(user_id));
        }
        Ok(user)
    }

    async fn fetch_active_item(&self, item_id: i64) -> Result<Item, MarketApiError> {
        let item = self.db.fetch_item(item_id).await?;
        if !item.active {
            return Err(MarketApiError::ItemNotFound(item_id));
        }
        Ok(item)
    }

    async fn check_ask_limit(&self, user: &User, item_id: i64) -> Result<(), MarketApiError> {
        let limit = self.limits.ask_limit_for(user);
        let filter = OrderFilter::default()
            .with_user_id(user.id)
            .with_item_id(item_id)
            .with_type(OrderType::Ask)
            .with_status(OrderStatusType::Live);
        let live = self.db.count_orders(&filter).await?;
        if live >= limit {
            debug!("🛒️ User #{} already has {live} live asks on item #{item_id}", user.id);
            return Err(MarketApiError::AskLimitReached(limit));
        }
        Ok(())
    }

    async fn resolve_profile(&self, reference: &str) -> Result<String, MarketApiError> {
        self.resolver.resolve_profile_id(reference).await.map_err(|e| {
            warn!("🛒️ Could not resolve profile reference {reference}. {e}");
            MarketApiError::ProfileResolution { reference: reference.to_string(), reason: e.to_string() }
        })
    }

    /// Asks listed under a reseller contract skip the first inventory check.
    async fn seed_reseller_verification(&self, order: &Order) {
        let api = VerificationApi::new(self.db.clone());
        let status = VerificationStatus::NameVerified;
        let result = api.record_result(order.id, VerificationKind::Inventory, status, Vec::new()).await;
        if let Err(e) = result {
            error!("🛒️ Could not record the reseller inventory verification for ask #{}. {e}", order.id);
        }
    }

    async fn queue_verification(&self, order: &Order, owner: User, kind: VerificationKind) {
        let item = match self.db.fetch_item(order.item_id).await {
            Ok(item) => item,
            Err(e) => {
                error!("🛒️ Not queueing {kind} verification for ask #{}. {e}", order.id);
                return;
            },
        };
        let priority = owner.task_priority();
        let details = OrderDetails::new(order.clone()).with_owner(owner).with_item(item);
        self.producers.publish_verification_task(VerificationTaskEvent::new(details, kind, priority)).await;
    }
}
