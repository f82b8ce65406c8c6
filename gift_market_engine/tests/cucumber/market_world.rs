use std::collections::HashMap;

use cucumber::World;
use gift_market_engine::{
    db_types::{Item, Order, User},
    events::EventProducers,
    test_utils::{
        fakes::{FakeInventory, FakeProfiles},
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    MarketApiError,
    MarketFlowApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    pub users: HashMap<String, User>,
    pub items: HashMap<String, Item>,
    /// Orders by the label the scenario gave them.
    pub orders: HashMap<String, Order>,
    pub last_error: Option<MarketApiError>,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: MarketFlowApi<SqliteDatabase, FakeProfiles>,
    pub inventory: FakeInventory,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Market not initialised")
    }

    pub fn user(&self, name: &str) -> &User {
        self.users.get(name).unwrap_or_else(|| panic!("Unknown user {name}"))
    }

    pub fn order_id(&self, label: &str) -> i64 {
        self.orders.get(label).map(|o| o.id).unwrap_or_else(|| panic!("Unknown order {label}"))
    }

    /// The only item in the scenario.
    pub fn item(&self) -> &Item {
        self.items.values().next().expect("No item has been created")
    }

    pub fn record(&mut self, label: Option<&str>, result: Result<Order, MarketApiError>) {
        match result {
            Ok(order) => {
                if let Some(label) = label {
                    self.orders.insert(label.to_string(), order);
                }
                self.last_error = None;
            },
            Err(e) => {
                debug!("🚀️ Request failed: {e}");
                self.last_error = Some(e);
            },
        }
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let api = MarketFlowApi::new(db.clone(), FakeProfiles::default(), EventProducers::default());
        Self { db_path: url, db, api, inventory: FakeInventory::default() }
    }
}
