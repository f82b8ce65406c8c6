use std::time::Duration;

use cucumber::{then, when};
use gift_market_engine::{
    db_types::{OrderStatusType, Price, VerificationKind},
    jobs::{JobConfig, JobKind, VerificationJob},
    traits::{OrderManagement, VerificationManagement},
    worker::{Task, TaskContext},
    OrderDraft,
    OrderPatch,
    VerificationApi,
};

use crate::cucumber::MarketWorld;

fn price(value: &str) -> Price {
    value.parse().expect("Invalid price")
}

#[when(expr = "'{word}' places a bid '{word}' for {word}")]
async fn place_bid(world: &mut MarketWorld, user: String, label: String, amount: String) {
    let draft = OrderDraft::bid(world.item().id, price(&amount));
    let result = world.system().api.create_order(world.user(&user).id, draft).await;
    world.record(Some(&label), result);
}

#[when(expr = "'{word}' lists an ask '{word}' for {word}")]
async fn list_ask(world: &mut MarketWorld, user: String, label: String, amount: String) {
    let draft = OrderDraft::ask(world.item().id, price(&amount));
    let result = world.system().api.create_order(world.user(&user).id, draft).await;
    world.record(Some(&label), result);
}

#[when(expr = "'{word}' lists {int} asks")]
async fn list_asks(world: &mut MarketWorld, user: String, count: usize) {
    for _ in 0..count {
        let draft = OrderDraft::ask(world.item().id, price("10.00"));
        let result = world.system().api.create_order(world.user(&user).id, draft).await;
        world.record(None, result);
    }
}

async fn patch_order(world: &mut MarketWorld, user: &str, label: &str, patch: OrderPatch) {
    let order_id = world.order_id(label);
    let result = world.system().api.update_order(world.user(user).id, order_id, patch).await;
    world.record(Some(label), result);
}

#[when(expr = "'{word}' reserves '{word}' for {word}")]
async fn reserve(world: &mut MarketWorld, user: String, label: String, buyer: String) {
    let patch = OrderPatch::default().with_status(OrderStatusType::Reserved).with_counterparty(buyer);
    patch_order(world, &user, &label, patch).await;
}

#[when(expr = "'{word}' sells '{word}' to {word}")]
async fn sell(world: &mut MarketWorld, user: String, label: String, buyer: String) {
    let patch = OrderPatch::default().with_status(OrderStatusType::Sold).with_counterparty(buyer);
    patch_order(world, &user, &label, patch).await;
}

#[when(expr = "'{word}' cancels '{word}'")]
async fn cancel(world: &mut MarketWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    let result = world.system().api.cancel_order(world.user(&user).id, order_id, None).await;
    world.record(Some(&label), result);
}

#[when("the delivery-check job runs")]
async fn run_delivery_check(world: &mut MarketWorld) {
    let system = world.system();
    let config = JobConfig::for_kind(JobKind::DeliveryCheck).with_pacing(Duration::ZERO);
    let api = VerificationApi::new(system.db.clone());
    let job = VerificationJob::new(JobKind::DeliveryCheck, api, system.inventory.clone()).with_config(config);
    job.run(&TaskContext::detached()).await.expect("Delivery check failed");
}

#[then(expr = "order '{word}' is {word}")]
async fn order_status(world: &mut MarketWorld, label: String, status: String) {
    let order = world.system().db.fetch_order(world.order_id(&label)).await.expect("Error fetching order");
    let expected = status.parse::<OrderStatusType>().expect("Invalid status");
    assert_eq!(order.status, expected, "Status of {label} is incorrect");
}

#[then(expr = "order '{word}' has counterparty {word}")]
async fn order_counterparty(world: &mut MarketWorld, label: String, profile_id: String) {
    let order = world.system().db.fetch_order(world.order_id(&label)).await.expect("Error fetching order");
    assert_eq!(order.counterparty_profile_id.as_deref(), Some(profile_id.as_str()));
}

#[then(expr = "the last request failed with {string}")]
async fn last_request_failed(world: &mut MarketWorld, message: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(err.to_string(), message);
}

#[then(expr = "the {word} verification of '{word}' is {word}")]
async fn verification_status(world: &mut MarketWorld, kind: String, label: String, status: String) {
    let kind = match kind.as_str() {
        "Inventory" => VerificationKind::Inventory,
        "Delivery" => VerificationKind::Delivery,
        k => panic!("Unknown verification kind {k}"),
    };
    let record = world
        .system()
        .db
        .fetch_verification(world.order_id(&label), kind)
        .await
        .expect("Error fetching verification")
        .expect("No verification on record");
    assert_eq!(record.status.to_string(), status);
}
