//! 服务器状态
//!
//! Wires repositories, lock service, engines and the event bus into one
//! shared handle. Cloning is cheap; every component inside is already
//! reference counted.

use crate::catalog::CatalogService;
use crate::core::{BackgroundTasks, Config};
use crate::db::{
    ListingRepository, MemoryListingRepository, MemoryNotificationRepository,
    MemoryOrderRepository, MemoryStoreRepository, NotificationRepository, OrderRepository,
    StoreRepository,
};
use crate::events::EventBus;
use crate::lock::{LockBackend, LockService, MemoryLockBackend};
use crate::orders::OrderManager;
use crate::scheduler::StatusSweeper;
use crate::stock::ReservationEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub events: EventBus,
    pub locks: LockService,
    pub stock: ReservationEngine,
    pub orders: OrderManager,
    pub catalog: CatalogService,
    pub sweeper: StatusSweeper,
}

impl ServerState {
    /// Build the full component graph over in-memory storage
    pub fn new(config: Config) -> Self {
        let listings: Arc<dyn ListingRepository> =
            Arc::new(MemoryListingRepository::new(config.reserve_wait));
        let orders: Arc<dyn OrderRepository> = Arc::new(MemoryOrderRepository::new());
        let stores: Arc<dyn StoreRepository> = Arc::new(MemoryStoreRepository::new());
        let notifications: Arc<dyn NotificationRepository> =
            Arc::new(MemoryNotificationRepository::new());
        let backend: Arc<dyn LockBackend> = Arc::new(MemoryLockBackend::new());

        Self::with_parts(config, listings, orders, stores, notifications, backend)
    }

    /// Build over caller-supplied storage and lock backend
    pub fn with_parts(
        config: Config,
        listings: Arc<dyn ListingRepository>,
        orders: Arc<dyn OrderRepository>,
        stores: Arc<dyn StoreRepository>,
        notifications: Arc<dyn NotificationRepository>,
        lock_backend: Arc<dyn LockBackend>,
    ) -> Self {
        let events = EventBus::new();
        let locks = LockService::with_default_ttl(lock_backend, config.lock_ttl);
        let stock = ReservationEngine::new(listings.clone(), events.clone());
        let order_manager = OrderManager::new(
            orders.clone(),
            listings.clone(),
            stores.clone(),
            stock.clone(),
            locks.clone(),
            events.clone(),
        );
        let catalog = CatalogService::new(listings.clone(), stores.clone(), events.clone());
        let sweeper = StatusSweeper::new(listings, orders, notifications, events.clone(), &config);

        Self {
            config,
            events,
            locks,
            stock,
            orders: order_manager,
            catalog,
            sweeper,
        }
    }

    /// Register the periodic sweeps on the task manager
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        self.sweeper.spawn_all(tasks, &self.config);
    }
}
