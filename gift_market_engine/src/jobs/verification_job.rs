use std::{fmt::Display, time::Duration};

use async_trait::async_trait;
use log::*;

use crate::{
    db_types::{OrderStatusType, OrderType, VerificationKind, VerificationRecord, VerificationStatus},
    market_api::verification_api::VerificationApi,
    traits::{CandidateQuery, OrderDetails, VerificationManagement},
    verification::{verify_delivery, verify_inventory, InventorySource, Verification, VerificationError},
    worker::{JobError, Task, TaskContext},
    MAX_VERIFICATION_RETRIES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Live asks whose inventory has not been confirmed yet.
    InventoryCheck,
    /// Live asks whose item was missing from the seller's inventory last time.
    InventoryRecheck,
    /// Sold asks whose delivery to the buyer has not been confirmed yet.
    DeliveryCheck,
    /// Sold asks whose sender is confirmed but whose gift the buyer has not unwrapped yet.
    GiftWrappedCheck,
}

impl JobKind {
    pub fn verification_kind(&self) -> VerificationKind {
        match self {
            JobKind::InventoryCheck | JobKind::InventoryRecheck => VerificationKind::Inventory,
            JobKind::DeliveryCheck | JobKind::GiftWrappedCheck => VerificationKind::Delivery,
        }
    }

    pub fn order_status(&self) -> OrderStatusType {
        match self {
            JobKind::InventoryCheck | JobKind::InventoryRecheck => OrderStatusType::Live,
            JobKind::DeliveryCheck | JobKind::GiftWrappedCheck => OrderStatusType::Sold,
        }
    }

    pub fn default_interval(&self) -> Duration {
        match self {
            JobKind::InventoryCheck | JobKind::DeliveryCheck | JobKind::GiftWrappedCheck => Duration::from_secs(3600),
            JobKind::InventoryRecheck => Duration::from_secs(12 * 3600),
        }
    }

    /// The first page of candidates for this job.
    pub fn candidate_query(&self, config: &JobConfig) -> CandidateQuery {
        let query = CandidateQuery::new(self.verification_kind(), OrderType::Ask, self.order_status())
            .with_limit(config.page_size)
            .with_retry_ceiling(config.retry_ceiling);
        match self {
            JobKind::InventoryRecheck => query.with_statuses(vec![VerificationStatus::NoHit]),
            JobKind::GiftWrappedCheck => {
                query.with_statuses(vec![VerificationStatus::SenderVerified]).wrapped_gifts_only()
            },
            JobKind::InventoryCheck | JobKind::DeliveryCheck => query,
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::InventoryCheck => write!(f, "inventory-check"),
            JobKind::InventoryRecheck => write!(f, "inventory-recheck"),
            JobKind::DeliveryCheck => write!(f, "delivery-check"),
            JobKind::GiftWrappedCheck => write!(f, "giftwrapped-check"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    pub interval: Duration,
    pub page_size: i64,
    /// Delay between two inventory fetches.
    pub pacing: Duration,
    pub retry_ceiling: i64,
}

impl JobConfig {
    pub fn for_kind(kind: JobKind) -> Self {
        Self {
            interval: kind.default_interval(),
            page_size: 10,
            pacing: Duration::from_millis(250),
            retry_ceiling: MAX_VERIFICATION_RETRIES,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Verifies, page by page, every order selected by the job kind, and records each outcome.
///
/// Orders whose owner, item or (for deliveries) buyer is missing are skipped. A failed inventory fetch is recorded as
/// [`VerificationStatus::Error`], which counts as a retry. Nothing that goes wrong with a single order stops the run.
pub struct VerificationJob<B, S> {
    kind: JobKind,
    api: VerificationApi<B>,
    source: S,
    config: JobConfig,
}

impl<B, S> VerificationJob<B, S> {
    pub fn new(kind: JobKind, api: VerificationApi<B>, source: S) -> Self {
        Self { kind, api, source, config: JobConfig::for_kind(kind) }
    }

    pub fn with_config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }
}

impl<B, S> VerificationJob<B, S>
where
    B: VerificationManagement,
    S: InventorySource,
{
    /// Verifies a single order and stores the result. Returns `None` if the order was skipped.
    pub async fn verify_one(&self, details: &OrderDetails) -> Result<Option<VerificationRecord>, JobError> {
        let order = &details.order;
        let (Some(owner), Some(item)) = (&details.owner, &details.item) else {
            warn!("🔍️ {}: order {} has no owner or item on record. Skipping it.", self.kind, order.id);
            return Ok(None);
        };
        let kind = self.kind.verification_kind();
        let outcome = match kind {
            VerificationKind::Inventory => {
                verify_inventory(&self.source, order.inventory_profile_id(owner), &item.name).await
            },
            VerificationKind::Delivery => {
                let Some(buyer) = order.counterparty_profile_id.as_deref() else {
                    warn!("🔍️ {}: sold ask {} has no buyer on record. Skipping it.", self.kind, order.id);
                    return Ok(None);
                };
                verify_delivery(&self.source, &owner.name, buyer, &item.name).await
            },
        };
        let Verification { status, assets } = match outcome {
            Ok(verification) => verification,
            Err(VerificationError::MissingParameter(p)) => {
                warn!("🔍️ {}: order {} is missing the {p}. Skipping it.", self.kind, order.id);
                return Ok(None);
            },
            Err(e) => Verification { status: e.status(), assets: Vec::new() },
        };
        let record = self.api.record_result(order.id, kind, status, assets).await?;
        debug!("🔍️ {}: order {} is {} after {} retries", self.kind, order.id, record.status, record.retries);
        Ok(Some(record))
    }
}

#[async_trait]
impl<B, S> Task for VerificationJob<B, S>
where
    B: VerificationManagement + 'static,
    S: InventorySource + 'static,
{
    fn display_name(&self) -> String {
        self.kind.to_string()
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Always works through every page. Shutdown is honoured between runs by the scheduler, never inside one.
    async fn run(&self, ctx: &TaskContext) -> Result<(), JobError> {
        let mut query = self.kind.candidate_query(&self.config);
        let mut checked = 0usize;
        let mut pages = 0usize;
        loop {
            let page = self.api.pending_verifications(&query).await?;
            pages += 1;
            trace!("🔍️ {}: page {pages} holds {} orders", self.kind, page.len());
            for details in &page {
                if let Err(e) = self.verify_one(details).await {
                    error!("🔍️ {}: could not record the result for order {}. {e}", self.kind, details.order.id);
                }
                checked += 1;
                if !self.config.pacing.is_zero() {
                    tokio::time::sleep(self.config.pacing).await;
                }
            }
            if (page.len() as i64) < self.config.page_size {
                break;
            }
            match page.last() {
                Some(last) => query = query.after(last.cursor()),
                None => break,
            }
        }
        info!("🔍️ {}: checked {checked} orders in {pages} page(s)", self.kind);
        if ctx.is_shutting_down() {
            debug!("🔍️ {}: run finished while shutdown is pending", self.kind);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use chrono::Utc;
    use gift_common::Price;
    use mockall::mock;

    use super::*;
    use crate::{
        db_types::{
            AccountStatus,
            Asset,
            Boons,
            Item,
            NewVerification,
            Order,
            User,
            VerificationUpdate,
        },
        traits::{Pagination, StoreError, VerificationFilter},
        verification::InventoryError,
    };

    mock! {
        pub Store {}

        #[async_trait]
        impl VerificationManagement for Store {
            async fn fetch_verification(&self, order_id: i64, kind: VerificationKind) -> Result<Option<VerificationRecord>, StoreError>;
            async fn fetch_verifications(&self, filter: &VerificationFilter, page: Option<Pagination>) -> Result<Vec<VerificationRecord>, StoreError>;
            async fn count_verifications(&self, filter: &VerificationFilter) -> Result<i64, StoreError>;
            async fn insert_verification(&self, record: NewVerification) -> Result<VerificationRecord, StoreError>;
            async fn update_verification(&self, id: i64, update: VerificationUpdate) -> Result<VerificationRecord, StoreError>;
            async fn fetch_verification_candidates(&self, query: &CandidateQuery) -> Result<Vec<OrderDetails>, StoreError>;
        }
    }

    struct Inventory {
        result: Result<Vec<Asset>, InventoryError>,
        calls: Arc<AtomicUsize>,
    }

    impl Inventory {
        fn holding(names: &[&str]) -> Self {
            let assets = names.iter().map(|n| Asset::new(*n).gifted_by("alice")).collect();
            Self { result: Ok(assets), calls: Arc::new(AtomicUsize::new(0)) }
        }

        fn failing() -> Self {
            Self { result: Err(InventoryError::Fetch("timeout".into())), calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    #[async_trait]
    impl InventorySource for Inventory {
        async fn fetch_inventory(&self, _profile_id: &str) -> Result<Vec<Asset>, InventoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn details(id: i64, status: OrderStatusType, buyer: Option<&str>) -> OrderDetails {
        let now = Utc::now();
        let order = Order {
            id,
            user_id: 1,
            item_id: 1,
            order_type: OrderType::Ask,
            status,
            price: Price::from_cents(500),
            currency: "USD".into(),
            notes: String::new(),
            counterparty_profile_id: buyer.map(String::from),
            seller_profile_id: None,
            resell: false,
            created_at: now,
            updated_at: now - chrono::Duration::seconds(id),
        };
        let owner = User {
            id: 1,
            profile_id: "76561198000000001".into(),
            name: "alice".into(),
            status: AccountStatus::Active,
            boons: Boons::default(),
            rank_score: 0,
            created_at: now,
            updated_at: now,
        };
        let item = Item { id: 1, name: "Arcana".into(), active: true, created_at: now, updated_at: now };
        OrderDetails::new(order).with_owner(owner).with_item(item)
    }

    fn page(start: i64, n: i64) -> Vec<OrderDetails> {
        (start..start + n).map(|id| details(id, OrderStatusType::Live, None)).collect()
    }

    fn record_from(new: NewVerification) -> VerificationRecord {
        let now = Utc::now();
        VerificationRecord {
            id: new.order_id,
            order_id: new.order_id,
            kind: new.kind,
            status: new.status,
            assets: new.assets,
            retries: new.retries,
            created_at: now,
            updated_at: now,
        }
    }

    fn store_accepting_writes(store: &mut MockStore) {
        store.expect_fetch_verification().returning(|_, _| Ok(None));
        store.expect_insert_verification().returning(|new| Ok(record_from(new)));
    }

    fn job(store: MockStore, kind: JobKind, source: Inventory) -> VerificationJob<MockStore, Inventory> {
        let config = JobConfig::for_kind(kind).with_pacing(Duration::ZERO);
        VerificationJob::new(kind, VerificationApi::new(store), source).with_config(config)
    }

    #[tokio::test]
    async fn full_page_requests_the_next_one() {
        let mut store = MockStore::new();
        store
            .expect_fetch_verification_candidates()
            .times(2)
            .returning(|q| if q.after.is_none() { Ok(page(1, 10)) } else { Ok(page(11, 7)) });
        store_accepting_writes(&mut store);
        let source = Inventory::holding(&["Arcana"]);
        let calls = Arc::clone(&source.calls);
        let job = job(store, JobKind::InventoryCheck, source);
        job.run(&TaskContext::detached()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 17);
    }

    #[tokio::test]
    async fn shutdown_does_not_cut_a_run_short() {
        let mut store = MockStore::new();
        store.expect_fetch_verification_candidates().times(1).returning(|_| Ok(page(1, 5)));
        store_accepting_writes(&mut store);
        let source = Inventory::holding(&["Arcana"]);
        let calls = Arc::clone(&source.calls);
        let job = job(store, JobKind::InventoryCheck, source);
        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send_replace(true);
        let ctx = TaskContext::new(rx);
        assert!(ctx.is_shutting_down());
        job.run(&ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn short_page_ends_the_run() {
        let mut store = MockStore::new();
        store.expect_fetch_verification_candidates().times(1).returning(|_| Ok(page(1, 7)));
        store_accepting_writes(&mut store);
        let job = job(store, JobKind::InventoryCheck, Inventory::holding(&["Arcana"]));
        job.run(&TaskContext::detached()).await.unwrap();
    }

    #[tokio::test]
    async fn second_page_continues_after_the_last_order_seen() {
        let first = page(1, 10);
        let expected = first[9].cursor();
        let mut store = MockStore::new();
        store
            .expect_fetch_verification_candidates()
            .withf(|q| q.after.is_none() && q.limit == 10 && q.retry_ceiling == 10)
            .times(1)
            .returning(move |_| Ok(first.clone()));
        store
            .expect_fetch_verification_candidates()
            .withf(move |q| q.after == Some(expected))
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store_accepting_writes(&mut store);
        let job = job(store, JobKind::InventoryCheck, Inventory::holding(&[]));
        job.run(&TaskContext::detached()).await.unwrap();
    }

    #[tokio::test]
    async fn recheck_only_selects_no_hits() {
        let mut store = MockStore::new();
        store
            .expect_fetch_verification_candidates()
            .withf(|q| q.statuses == vec![VerificationStatus::NoHit] && q.order_status == OrderStatusType::Live)
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let job = job(store, JobKind::InventoryRecheck, Inventory::holding(&[]));
        assert_eq!(job.interval(), Duration::from_secs(12 * 3600));
        job.run(&TaskContext::detached()).await.unwrap();
    }

    #[tokio::test]
    async fn giftwrapped_check_selects_unopened_deliveries() {
        let mut store = MockStore::new();
        store
            .expect_fetch_verification_candidates()
            .withf(|q| {
                q.kind == VerificationKind::Delivery &&
                    q.order_status == OrderStatusType::Sold &&
                    q.statuses == vec![VerificationStatus::SenderVerified] &&
                    q.wrapped_only
            })
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let job = job(store, JobKind::GiftWrappedCheck, Inventory::holding(&[]));
        assert_eq!(job.display_name(), "giftwrapped-check");
        assert_eq!(job.interval(), Duration::from_secs(3600));
        job.run(&TaskContext::detached()).await.unwrap();
    }

    #[tokio::test]
    async fn sold_asks_without_a_buyer_are_skipped() {
        let mut store = MockStore::new();
        store
            .expect_fetch_verification_candidates()
            .returning(|_| Ok(vec![details(1, OrderStatusType::Sold, None)]));
        store.expect_fetch_verification().never();
        store.expect_insert_verification().never();
        let source = Inventory::holding(&["Arcana"]);
        let calls = Arc::clone(&source.calls);
        let job = job(store, JobKind::DeliveryCheck, source);
        job.run(&TaskContext::detached()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delivery_from_the_seller_is_sender_verified() {
        let mut store = MockStore::new();
        store.expect_fetch_verification().returning(|_, _| Ok(None));
        store
            .expect_insert_verification()
            .withf(|new| {
                new.kind == VerificationKind::Delivery &&
                    new.status == VerificationStatus::SenderVerified &&
                    new.retries == 0
            })
            .times(1)
            .returning(|new| Ok(record_from(new)));
        let job = job(store, JobKind::DeliveryCheck, Inventory::holding(&["Arcana", "Other"]));
        let record = job.verify_one(&details(3, OrderStatusType::Sold, Some("76561198000000002"))).await.unwrap();
        let record = record.expect("A record is written");
        assert_eq!(record.assets.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failures_are_recorded_as_errors() {
        let mut store = MockStore::new();
        store.expect_fetch_verification().returning(|_, _| Ok(None));
        store
            .expect_insert_verification()
            .withf(|new| new.status == VerificationStatus::Error && new.retries == 1)
            .times(1)
            .returning(|new| Ok(record_from(new)));
        let job = job(store, JobKind::InventoryCheck, Inventory::failing());
        let record = job.verify_one(&details(4, OrderStatusType::Live, None)).await.unwrap();
        assert_eq!(record.map(|r| r.status), Some(VerificationStatus::Error));
    }

    #[tokio::test]
    async fn write_failures_do_not_abort_the_batch() {
        let mut store = MockStore::new();
        store.expect_fetch_verification_candidates().returning(|_| Ok(page(1, 3)));
        store.expect_fetch_verification().returning(|_, _| Err(StoreError::DatabaseError("locked".into())));
        let source = Inventory::holding(&["Arcana"]);
        let calls = Arc::clone(&source.calls);
        let job = job(store, JobKind::InventoryCheck, source);
        job.run(&TaskContext::detached()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
