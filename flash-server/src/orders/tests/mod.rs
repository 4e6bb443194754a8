//! OrderManager 测试辅助工具
//!
//! Shared fixtures: fully-wired manager over in-memory repositories plus
//! seed helpers for stores, listings and create payloads.

mod test_boundary;

use crate::db::{
    ListingRepository, MemoryListingRepository, MemoryOrderRepository, MemoryStoreRepository,
    StoreRepository,
};
use crate::events::EventBus;
use crate::lock::{LockService, MemoryLockBackend};
use crate::orders::OrderManager;
use crate::stock::ReservationEngine;
use rust_decimal::Decimal;
use shared::models::{
    Listing, ListingCreate, OrderCreate, OrderLineInput, PaymentMethod, Store, StoreStatus,
};
use shared::types::Id;
use shared::util;
use std::sync::Arc;
use std::time::Duration;

pub struct TestContext {
    pub manager: OrderManager,
    pub listings: Arc<MemoryListingRepository>,
    pub orders: Arc<MemoryOrderRepository>,
    pub stores: Arc<MemoryStoreRepository>,
    pub locks: LockService,
    pub events: EventBus,
}

/// Wire a manager over fresh in-memory state
pub fn ctx() -> TestContext {
    let listings = Arc::new(MemoryListingRepository::new(Duration::from_millis(200)));
    let orders = Arc::new(MemoryOrderRepository::new());
    let stores = Arc::new(MemoryStoreRepository::new());
    let events = EventBus::new();
    let locks = LockService::new(Arc::new(MemoryLockBackend::new()));
    let stock = ReservationEngine::new(listings.clone(), events.clone());

    let manager = OrderManager::new(
        orders.clone(),
        listings.clone(),
        stores.clone(),
        stock,
        locks.clone(),
        events.clone(),
    );

    TestContext {
        manager,
        listings,
        orders,
        stores,
        locks,
        events,
    }
}

pub async fn seed_store(ctx: &TestContext, id: Id, status: StoreStatus) -> Store {
    ctx.stores
        .insert(Store::new(id, "Corner Bakery", status))
        .await
        .unwrap()
}

/// Listing inside an open sale window, priced 3.50 a unit
pub async fn seed_listing(ctx: &TestContext, store_id: Id, quantity: u32) -> Listing {
    seed_listing_priced(ctx, store_id, quantity, Decimal::new(350, 2)).await
}

pub async fn seed_listing_priced(
    ctx: &TestContext,
    store_id: Id,
    quantity: u32,
    flash_price: Decimal,
) -> Listing {
    let now = util::now_millis();
    ctx.listings
        .insert(
            ListingCreate {
                store_id,
                name: "Surplus bento box".into(),
                description: None,
                image_url: None,
                original_price: flash_price * Decimal::from(3),
                flash_price,
                quantity,
                sale_start: now - 3_600_000,
                sale_end: now + 3_600_000,
            }
            .into_listing(now),
        )
        .await
        .unwrap()
}

pub fn create_req(customer_id: Id, store_id: Id, lines: Vec<(Id, u32)>) -> OrderCreate {
    OrderCreate {
        customer_id,
        store_id,
        lines: lines
            .into_iter()
            .map(|(listing_id, quantity)| OrderLineInput {
                listing_id,
                quantity,
            })
            .collect(),
        payment_method: PaymentMethod::Card,
        pickup_time: util::now_millis() + 1_800_000,
        special_instructions: None,
    }
}
