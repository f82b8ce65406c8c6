use std::time::Duration;

use gift_market_engine::{
    db_types::{
        Asset,
        NewItem,
        NewOrder,
        NewUser,
        OrderStatusType,
        OrderType,
        Price,
        VerificationKind,
        VerificationRecord,
        VerificationStatus,
    },
    test_utils::{
        fakes::{FakeInventory, FakeProfiles},
        prepare_env::fresh_database,
    },
    traits::{InsertGuard, OrderManagement, UserManagement, VerificationManagement},
    worker::Task,
    OrderDraft,
    SqliteDatabase,
    VerificationApi,
};
use gift_market_server::{
    config::ServerConfig,
    daemon::{create_verification_jobs, MarketDaemon},
};

const ALICE: &str = "76561198000000001";
const BOB: &str = "76561198000000002";

fn test_config() -> ServerConfig {
    ServerConfig { pacing: Duration::ZERO, shutdown_timeout: Duration::from_secs(5), ..Default::default() }
}

/// Polls the store until the record exists and satisfies `done`, or two seconds pass.
async fn wait_for_record<F>(db: &SqliteDatabase, order_id: i64, kind: VerificationKind, done: F) -> VerificationRecord
where F: Fn(&VerificationRecord) -> bool {
    for _ in 0..40 {
        if let Some(record) = db.fetch_verification(order_id, kind).await.unwrap() {
            if done(&record) {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("No settled {kind:?} verification for order {order_id}");
}

#[tokio::test]
async fn new_asks_are_verified_out_of_band() {
    let db = fresh_database().await;
    let alice = db.insert_user(NewUser::new(ALICE, "alice")).await.unwrap();
    let item = db.insert_item(NewItem::new("Arcana")).await.unwrap();
    let inventory = FakeInventory::default();
    inventory.set_assets(ALICE, vec![Asset::new("Arcana")]);

    let daemon = MarketDaemon::start(&test_config(), db.clone(), inventory, FakeProfiles::default());
    let api = daemon.market_api();
    let ask = api.create_order(alice.id, OrderDraft::ask(item.id, Price::from_cents(1500))).await.unwrap();
    drop(api);

    let record = wait_for_record(&db, ask.id, VerificationKind::Inventory, |r| {
        r.status == VerificationStatus::NameVerified
    })
    .await;
    assert_eq!(record.assets, vec![Asset::new("Arcana")]);
    assert_eq!(record.retries, 0);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn pending_deliveries_are_checked_at_startup() {
    let db = fresh_database().await;
    let alice = db.insert_user(NewUser::new(ALICE, "alice")).await.unwrap();
    let item = db.insert_item(NewItem::new("Arcana")).await.unwrap();
    let sold = NewOrder {
        user_id: alice.id,
        item_id: item.id,
        order_type: OrderType::Ask,
        status: OrderStatusType::Sold,
        price: Price::from_cents(1500),
        currency: "USD".into(),
        notes: String::new(),
        counterparty_profile_id: Some(BOB.into()),
        seller_profile_id: None,
        resell: false,
    };
    let sold = db.insert_order(sold, InsertGuard::default()).await.unwrap().order;
    let inventory = FakeInventory::default();
    inventory.set_assets(BOB, vec![Asset::new("Arcana").gifted_by("alice")]);

    let daemon = MarketDaemon::start(&test_config(), db.clone(), inventory, FakeProfiles::default());
    let record = wait_for_record(&db, sold.id, VerificationKind::Delivery, |r| {
        r.status == VerificationStatus::SenderVerified
    })
    .await;
    assert_eq!(record.retries, 0);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn private_inventories_count_as_retries() {
    let db = fresh_database().await;
    let alice = db.insert_user(NewUser::new(ALICE, "alice")).await.unwrap();
    let item = db.insert_item(NewItem::new("Arcana")).await.unwrap();
    let inventory = FakeInventory::default();
    inventory.set_private(ALICE);

    let daemon = MarketDaemon::start(&test_config(), db.clone(), inventory, FakeProfiles::default());
    let api = daemon.market_api();
    let ask = api.create_order(alice.id, OrderDraft::ask(item.id, Price::from_cents(900))).await.unwrap();
    drop(api);

    let record = wait_for_record(&db, ask.id, VerificationKind::Inventory, |_| true).await;
    assert_eq!(record.status, VerificationStatus::Private);
    assert!(record.retries >= 1);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_job_per_kind() {
    let db = fresh_database().await;
    let config = ServerConfig {
        inventory_recheck_interval: Duration::from_secs(600),
        giftwrapped_check_interval: Duration::from_secs(7200),
        ..test_config()
    };
    let tasks = create_verification_jobs(&config, VerificationApi::new(db), FakeInventory::default());
    let names = tasks.iter().map(|t| t.display_name()).collect::<Vec<_>>();
    assert_eq!(names, vec!["inventory-check", "inventory-recheck", "delivery-check", "giftwrapped-check"]);
    let intervals = tasks.iter().map(|t| t.interval().as_secs()).collect::<Vec<_>>();
    assert_eq!(intervals, vec![3600, 600, 3600, 7200]);
}
