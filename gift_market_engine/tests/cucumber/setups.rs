use cucumber::given;
use gift_market_engine::{
    db_types::{Asset, NewItem, NewUser},
    traits::UserManagement,
};

use crate::cucumber::{market_world::MarketSystem, MarketWorld};

#[given("a fresh market")]
async fn fresh_market(world: &mut MarketWorld) {
    world.system = Some(MarketSystem::new().await);
}

#[given(expr = "a user '{word}' with profile {word}")]
async fn add_user(world: &mut MarketWorld, name: String, profile_id: String) {
    let user = world.system().db.insert_user(NewUser::new(profile_id, name.clone())).await.expect("Error adding user");
    world.users.insert(name, user);
}

#[given(expr = "an item called '{word}'")]
async fn add_item(world: &mut MarketWorld, name: String) {
    let item = world.system().db.insert_item(NewItem::new(name.clone())).await.expect("Error adding item");
    world.items.insert(name, item);
}

#[given(expr = "'{word}' received '{word}' from '{word}'")]
async fn received_gift(world: &mut MarketWorld, buyer: String, item: String, gifter: String) {
    let profile_id = world.user(&buyer).profile_id.clone();
    world.system().inventory.set_assets(&profile_id, vec![Asset::new(item).gifted_by(gifter)]);
}
