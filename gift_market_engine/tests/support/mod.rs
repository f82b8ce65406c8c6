#![allow(dead_code)]

use gift_market_engine::{
    db_types::{Boon, Item, NewItem, NewOrder, NewUser, Order, OrderStatusType, OrderType, Price, User},
    events::EventProducers,
    test_utils::{fakes::FakeProfiles, prepare_env::fresh_database},
    traits::{InsertGuard, MarketDatabase, OrderManagement, UserManagement},
    MarketFlowApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const ALICE: &str = "76561198000000001";
pub const BOB: &str = "76561198000000002";
pub const CAROL: &str = "76561198000000003";

pub struct Market {
    pub db: SqliteDatabase,
    pub api: MarketFlowApi<SqliteDatabase, FakeProfiles>,
    pub alice: User,
    pub bob: User,
    pub item: Item,
}

impl Market {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db = fresh_database().await;
        let alice = db.insert_user(NewUser::new(ALICE, "alice")).await.expect("Error creating alice");
        let bob = db.insert_user(NewUser::new(BOB, "bob")).await.expect("Error creating bob");
        let item = db.insert_item(NewItem::new("Arcana")).await.expect("Error creating item");
        let profiles = FakeProfiles::default().with_vanity("bobby", BOB).with_vanity("shopfront", CAROL);
        let api = MarketFlowApi::new(db.clone(), profiles, producers);
        Self { db, api, alice, bob, item }
    }

    pub async fn add_user(&self, profile_id: &str, name: &str, boons: &[Boon]) -> User {
        let user = boons.iter().fold(NewUser::new(profile_id, name), |u, b| u.with_boon(*b));
        self.db.insert_user(user).await.expect("Error creating user")
    }

    /// Writes an order straight to the store, bypassing every market rule.
    pub async fn raw_order(&self, user_id: i64, order_type: OrderType, status: OrderStatusType) -> Order {
        let order = NewOrder {
            user_id,
            item_id: self.item.id,
            order_type,
            status,
            price: Price::from_cents(1000),
            currency: "USD".into(),
            notes: String::new(),
            counterparty_profile_id: None,
            seller_profile_id: None,
            resell: false,
        };
        self.db.insert_order(order, InsertGuard::default()).await.expect("Error inserting order").order
    }

    pub async fn tear_down(self) {
        let url = self.db.url().to_string();
        self.db.close().await;
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove test database {url}. {e}");
        }
    }
}
