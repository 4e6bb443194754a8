//! Expiry Scheduler
//!
//! Periodic sweeps that move time-derived state forward:
//!
//! - listing sweep: flags listings whose sale window elapsed
//! - order sweep: expires READY/PREPARING orders past pickup + grace
//! - notification sweep: drops notifications past the retention window
//!
//! Each sweep is idempotent and per-row fault isolated: one bad row is
//! logged and skipped, the rest of the batch still lands. Expired
//! pickups do not return stock — the goods were prepared and are no
//! longer sellable.

use crate::core::{BackgroundTasks, Config, TaskKind};
use crate::db::{ListingRepository, NotificationRepository, OrderRepository};
use crate::events::{DomainEvent, EventBus};
use shared::util;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone)]
pub struct StatusSweeper {
    listings: Arc<dyn ListingRepository>,
    orders: Arc<dyn OrderRepository>,
    notifications: Arc<dyn NotificationRepository>,
    events: EventBus,
    /// READY/PREPARING 订单在 pickup_time 之后的宽限毫秒数
    pickup_grace_millis: i64,
    notification_retention_days: i64,
}

impl StatusSweeper {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        orders: Arc<dyn OrderRepository>,
        notifications: Arc<dyn NotificationRepository>,
        events: EventBus,
        config: &Config,
    ) -> Self {
        Self {
            listings,
            orders,
            notifications,
            events,
            pickup_grace_millis: config.pickup_grace_millis(),
            notification_retention_days: config.notification_retention_days,
        }
    }

    // ========================================================================
    // Sweeps
    // ========================================================================

    /// Flag listings whose sale window has elapsed. Returns how many
    /// rows actually changed.
    pub async fn sweep_expired_listings(&self) -> usize {
        let now = util::now_millis();
        let candidates = match self.listings.find_expiry_candidates(now).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Listing sweep: candidate scan failed");
                return 0;
            }
        };

        let mut expired = 0;
        for id in candidates {
            match self.listings.mark_expired(id, now).await {
                Ok(true) => {
                    expired += 1;
                    self.events.emit(DomainEvent::ListingExpired { listing_id: id });
                }
                Ok(false) => {} // Lost the race to another sweep or a delete
                Err(e) => {
                    tracing::warn!(listing_id = id, error = %e, "Listing sweep: row skipped");
                }
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Listing sweep: listings expired");
        }
        expired
    }

    /// Expire READY/PREPARING orders whose pickup time plus grace has
    /// passed. Stock is not restored.
    pub async fn sweep_stale_orders(&self) -> usize {
        let cutoff = util::now_millis() - self.pickup_grace_millis;
        let candidates = match self.orders.find_pickup_expired(cutoff).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Order sweep: candidate scan failed");
                return 0;
            }
        };

        let mut expired = 0;
        for id in candidates {
            match self.orders.expire(id, cutoff).await {
                Ok(true) => {
                    expired += 1;
                    self.events.emit(DomainEvent::OrderExpired { order_id: id });
                }
                Ok(false) => {} // Picked up or already expired since the scan
                Err(e) => {
                    tracing::warn!(order_id = id, error = %e, "Order sweep: row skipped");
                }
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Order sweep: stale orders expired");
        }
        expired
    }

    /// Drop notifications older than the retention window
    pub async fn sweep_old_notifications(&self) -> usize {
        let cutoff = util::now_millis() - self.notification_retention_days * MILLIS_PER_DAY;
        match self.notifications.delete_older_than(cutoff).await {
            Ok(0) => 0,
            Ok(deleted) => {
                tracing::info!(count = deleted, "Notification sweep: old rows deleted");
                deleted
            }
            Err(e) => {
                tracing::error!(error = %e, "Notification sweep failed");
                0
            }
        }
    }

    // ========================================================================
    // Task registration
    // ========================================================================

    /// Register all three periodic sweeps on the task manager
    pub fn spawn_all(&self, tasks: &mut BackgroundTasks, config: &Config) {
        let token = tasks.shutdown_token();
        let sweeper = self.clone();
        let interval = config.listing_sweep_interval;
        tasks.spawn("listing_sweep", TaskKind::Periodic, async move {
            run_periodic(interval, token, move || {
                let sweeper = sweeper.clone();
                async move { sweeper.sweep_expired_listings().await }
            })
            .await;
        });

        let token = tasks.shutdown_token();
        let sweeper = self.clone();
        let interval = config.order_sweep_interval;
        tasks.spawn("order_sweep", TaskKind::Periodic, async move {
            run_periodic(interval, token, move || {
                let sweeper = sweeper.clone();
                async move { sweeper.sweep_stale_orders().await }
            })
            .await;
        });

        let token = tasks.shutdown_token();
        let sweeper = self.clone();
        let interval = config.notification_sweep_interval;
        tasks.spawn("notification_sweep", TaskKind::Periodic, async move {
            run_periodic(interval, token, move || {
                let sweeper = sweeper.clone();
                async move { sweeper.sweep_old_notifications().await }
            })
            .await;
        });
    }
}

/// Tick `sweep` every `interval` until the token cancels. The first
/// tick fires immediately so a restart catches up right away.
async fn run_periodic<F, Fut>(interval: Duration, token: CancellationToken, sweep: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = usize>,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Sweep loop stopped");
                break;
            }
            _ = ticker.tick() => {
                sweep().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        MemoryListingRepository, MemoryNotificationRepository, MemoryOrderRepository,
    };
    use rust_decimal_macros::dec;
    use shared::models::{
        Listing, ListingCreate, ListingStatus, Notification, NotificationKind, Order, OrderLine,
        OrderStatus, PaymentMethod,
    };
    use shared::types::Timestamp;

    struct Fixture {
        sweeper: StatusSweeper,
        listings: Arc<MemoryListingRepository>,
        orders: Arc<MemoryOrderRepository>,
        notifications: Arc<MemoryNotificationRepository>,
        events: EventBus,
    }

    fn fixture() -> Fixture {
        let listings = Arc::new(MemoryListingRepository::new(Duration::from_millis(200)));
        let orders = Arc::new(MemoryOrderRepository::new());
        let notifications = Arc::new(MemoryNotificationRepository::new());
        let events = EventBus::new();
        let sweeper = StatusSweeper::new(
            listings.clone(),
            orders.clone(),
            notifications.clone(),
            events.clone(),
            &Config::default(),
        );
        Fixture {
            sweeper,
            listings,
            orders,
            notifications,
            events,
        }
    }

    async fn seed_listing(f: &Fixture, sale_end: Timestamp) -> Listing {
        let now = util::now_millis();
        f.listings
            .insert(
                ListingCreate {
                    store_id: 1,
                    name: "Bread basket".into(),
                    description: None,
                    image_url: None,
                    original_price: dec!(8.00),
                    flash_price: dec!(2.50),
                    quantity: 5,
                    sale_start: sale_end - 3_600_000,
                    sale_end,
                }
                .into_listing(now),
            )
            .await
            .unwrap()
    }

    async fn seed_order(f: &Fixture, status: OrderStatus, pickup_time: Timestamp) -> Order {
        let now = util::now_millis();
        let order = Order {
            id: util::snowflake_id(),
            order_number: util::generate_order_number(),
            customer_id: 100,
            store_id: 1,
            lines: vec![OrderLine {
                listing_id: 1,
                name: "Bread basket".into(),
                quantity: 1,
                unit_price: dec!(2.50),
                subtotal: dec!(2.50),
            }],
            total_amount: dec!(2.50),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Card,
            pickup_time,
            special_instructions: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
        };
        let payment = shared::models::Payment::pending(
            order.id,
            order.total_amount,
            order.payment_method,
            now,
        );
        f.orders.create_with_payment(order.clone(), payment).await.unwrap();

        // Walk the pipeline to the requested state
        if status != OrderStatus::Pending {
            f.orders
                .cas_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
                .await
                .unwrap();
        }
        if matches!(status, OrderStatus::Preparing | OrderStatus::Ready) {
            f.orders
                .cas_status(order.id, OrderStatus::Confirmed, OrderStatus::Preparing)
                .await
                .unwrap();
        }
        if status == OrderStatus::Ready {
            f.orders
                .cas_status(order.id, OrderStatus::Preparing, OrderStatus::Ready)
                .await
                .unwrap();
        }
        f.orders.find_by_id(order.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn listing_sweep_flags_elapsed_windows() {
        let f = fixture();
        let now = util::now_millis();
        let stale = seed_listing(&f, now - 1_000).await;
        let live = seed_listing(&f, now + 3_600_000).await;
        let mut rx = f.events.subscribe();

        assert_eq!(f.sweeper.sweep_expired_listings().await, 1);

        let after = f.listings.find_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(after.status, ListingStatus::Expired);
        assert!(after.is_expired);
        let untouched = f.listings.find_by_id(live.id).await.unwrap().unwrap();
        assert!(!untouched.is_expired);

        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::ListingExpired { listing_id: stale.id }
        );
    }

    #[tokio::test]
    async fn listing_sweep_is_idempotent() {
        let f = fixture();
        let now = util::now_millis();
        seed_listing(&f, now - 1_000).await;

        assert_eq!(f.sweeper.sweep_expired_listings().await, 1);
        assert_eq!(f.sweeper.sweep_expired_listings().await, 0);
    }

    #[tokio::test]
    async fn order_sweep_expires_past_grace_only() {
        let f = fixture();
        let now = util::now_millis();
        let grace = Config::default().pickup_grace_millis();

        let overdue = seed_order(&f, OrderStatus::Ready, now - grace - 60_000).await;
        let within_grace = seed_order(&f, OrderStatus::Ready, now - 60_000).await;
        let preparing_overdue =
            seed_order(&f, OrderStatus::Preparing, now - grace - 60_000).await;
        let pending = seed_order(&f, OrderStatus::Pending, now - grace - 60_000).await;

        assert_eq!(f.sweeper.sweep_stale_orders().await, 2);

        let check = |id| {
            let f = &f;
            async move { f.orders.find_by_id(id).await.unwrap().unwrap().status }
        };
        assert_eq!(check(overdue.id).await, OrderStatus::Expired);
        assert_eq!(check(preparing_overdue.id).await, OrderStatus::Expired);
        assert_eq!(check(within_grace.id).await, OrderStatus::Ready);
        assert_eq!(check(pending.id).await, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn expired_pickup_does_not_restore_stock() {
        let f = fixture();
        let now = util::now_millis();
        let listing = seed_listing(&f, now + 3_600_000).await;

        // Reserve two units the way a real order would have
        f.listings
            .reserve_if_available(listing.id, 2, now)
            .await
            .unwrap();

        let grace = Config::default().pickup_grace_millis();
        seed_order(&f, OrderStatus::Ready, now - grace - 60_000).await;
        assert_eq!(f.sweeper.sweep_stale_orders().await, 1);

        let after = f.listings.find_by_id(listing.id).await.unwrap().unwrap();
        assert_eq!(after.available_quantity, 3);
    }

    #[tokio::test]
    async fn order_sweep_is_idempotent() {
        let f = fixture();
        let now = util::now_millis();
        let grace = Config::default().pickup_grace_millis();
        seed_order(&f, OrderStatus::Ready, now - grace - 60_000).await;

        assert_eq!(f.sweeper.sweep_stale_orders().await, 1);
        assert_eq!(f.sweeper.sweep_stale_orders().await, 0);
    }

    #[tokio::test]
    async fn notification_sweep_honors_retention() {
        let f = fixture();
        let now = util::now_millis();
        let retention = Config::default().notification_retention_days;

        let mut old = Notification::new(
            100,
            NotificationKind::Promotion,
            "Old promo",
            "Long gone",
        );
        old.created_at = now - (retention + 1) * MILLIS_PER_DAY;
        f.notifications.insert(old).await.unwrap();

        let fresh = Notification::new(
            100,
            NotificationKind::OrderReady,
            "Order ready",
            "Come pick it up",
        );
        f.notifications.insert(fresh).await.unwrap();

        assert_eq!(f.sweeper.sweep_old_notifications().await, 1);
        assert_eq!(f.notifications.find_by_user(100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn spawned_sweeps_stop_on_shutdown() {
        let f = fixture();
        let mut tasks = BackgroundTasks::new();
        f.sweeper.spawn_all(&mut tasks, &Config::default());
        assert_eq!(tasks.len(), 3);
        tasks.shutdown().await;
    }
}
