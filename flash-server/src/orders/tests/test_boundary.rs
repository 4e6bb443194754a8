//! 边界与并发测试
//!
//! Multi-line rollback, the duplicate-submit lock, and racing creates
//! against one listing.

use super::*;
use crate::db::RepoResult;
use crate::orders::OrderError;
use crate::stock::StockError;
use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{ListingStatus, ListingUpdate, OrderStatus, PaymentStatus};
use shared::types::Timestamp;
use std::time::Duration;

#[tokio::test]
async fn failed_line_rolls_back_earlier_reservations() {
    let ctx = ctx();
    seed_store(&ctx, 1, StoreStatus::Active).await;
    let plenty = seed_listing(&ctx, 1, 10).await;
    let scarce = seed_listing(&ctx, 1, 1).await;

    let err = ctx
        .manager
        .create_order(create_req(100, 1, vec![(plenty.id, 3), (scarce.id, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Stock(StockError::Insufficient { .. })));

    // First line's reservation fully undone
    let a = ctx.listings.find_by_id(plenty.id).await.unwrap().unwrap();
    assert_eq!(a.available_quantity, 10);
    let b = ctx.listings.find_by_id(scarce.id).await.unwrap().unwrap();
    assert_eq!(b.available_quantity, 1);

    // Nothing persisted
    assert!(ctx.manager.orders_for_customer(100, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_listing_rolls_back_earlier_reservations() {
    let ctx = ctx();
    seed_store(&ctx, 1, StoreStatus::Active).await;
    let listing = seed_listing(&ctx, 1, 10).await;

    let err = ctx
        .manager
        .create_order(create_req(100, 1, vec![(listing.id, 3), (777, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Stock(StockError::NotFound(777))));

    let after = ctx.listings.find_by_id(listing.id).await.unwrap().unwrap();
    assert_eq!(after.available_quantity, 10);
}

#[tokio::test]
async fn held_submit_lock_rejects_the_customer() {
    let ctx = ctx();
    seed_store(&ctx, 1, StoreStatus::Active).await;
    let listing = seed_listing(&ctx, 1, 10).await;

    // Another in-flight submit by customer 100 holds the advisory lock
    assert!(
        ctx.locks
            .try_acquire("order:submit:100", "in-flight", Duration::from_secs(5))
            .await
    );

    let err = ctx
        .manager
        .create_order(create_req(100, 1, vec![(listing.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::LockUnavailable));

    // A different customer is unaffected
    ctx.manager
        .create_order(create_req(101, 1, vec![(listing.id, 1)]))
        .await
        .unwrap();
}

#[tokio::test]
async fn submit_lock_released_after_create() {
    let ctx = ctx();
    seed_store(&ctx, 1, StoreStatus::Active).await;
    let listing = seed_listing(&ctx, 1, 10).await;

    ctx.manager
        .create_order(create_req(100, 1, vec![(listing.id, 1)]))
        .await
        .unwrap();
    assert!(!ctx.locks.is_locked("order:submit:100").await);

    // And after a failed create too
    ctx.manager
        .create_order(create_req(100, 1, vec![(listing.id, 99)]))
        .await
        .unwrap_err();
    assert!(!ctx.locks.is_locked("order:submit:100").await);
}

#[tokio::test]
async fn racing_customers_never_oversell() {
    let ctx = ctx();
    seed_store(&ctx, 1, StoreStatus::Active).await;
    let listing = seed_listing(&ctx, 1, 5).await;

    let mut handles = Vec::new();
    for customer in 0..10 {
        let manager = ctx.manager.clone();
        let id = listing.id;
        handles.push(tokio::spawn(async move {
            manager.create_order(create_req(customer, 1, vec![(id, 1)])).await
        }));
    }

    let mut created = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            created += 1;
        }
    }
    assert_eq!(created, 5);

    let after = ctx.listings.find_by_id(listing.id).await.unwrap().unwrap();
    assert_eq!(after.available_quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancel_and_payment_settle_payment_once() {
    for _ in 0..64 {
        let ctx = ctx();
        seed_store(&ctx, 1, StoreStatus::Active).await;
        let listing = seed_listing(&ctx, 1, 5).await;
        let order = ctx
            .manager
            .create_order(create_req(100, 1, vec![(listing.id, 1)]))
            .await
            .unwrap();

        let m1 = ctx.manager.clone();
        let m2 = ctx.manager.clone();
        let id = order.id;
        let cancel = tokio::spawn(async move { m1.cancel_order(id, None).await });
        let pay = tokio::spawn(async move { m2.process_payment(id).await });
        let cancel = cancel.await.unwrap();
        let pay = pay.await.unwrap();

        assert!(cancel.is_ok(), "cancel failed: {:?}", cancel.err());
        let stored = ctx.manager.payment_for_order(order.id).await.unwrap();
        match pay {
            // Capture won the CAS; the later cancel must not clobber it
            Ok(p) => {
                assert_eq!(p.status, PaymentStatus::Paid);
                assert_eq!(stored.status, PaymentStatus::Paid);
                assert!(stored.transaction_id.is_some());
            }
            // Cancel won; the capture saw a settled payment
            Err(OrderError::PaymentNotPending(_)) => {
                assert_eq!(stored.status, PaymentStatus::Cancelled);
            }
            Err(other) => panic!("unexpected payment error: {other}"),
        }
        assert_ne!(stored.status, PaymentStatus::Pending);
    }
}

/// Listing store whose restore path always reports lock contention
struct StuckRestoreRepo {
    inner: Arc<MemoryListingRepository>,
}

#[async_trait]
impl ListingRepository for StuckRestoreRepo {
    async fn insert(&self, listing: Listing) -> RepoResult<Listing> {
        self.inner.insert(listing).await
    }

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Listing>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_store(&self, store_id: Id) -> RepoResult<Vec<Listing>> {
        self.inner.find_by_store(store_id).await
    }

    async fn update_with_revision(
        &self,
        id: Id,
        update: ListingUpdate,
        expected_revision: u64,
    ) -> RepoResult<Listing> {
        self.inner.update_with_revision(id, update, expected_revision).await
    }

    async fn set_status(&self, id: Id, status: ListingStatus) -> RepoResult<Listing> {
        self.inner.set_status(id, status).await
    }

    async fn find_expiry_candidates(&self, now: Timestamp) -> RepoResult<Vec<Id>> {
        self.inner.find_expiry_candidates(now).await
    }

    async fn mark_expired(&self, id: Id, now: Timestamp) -> RepoResult<bool> {
        self.inner.mark_expired(id, now).await
    }

    async fn reserve_if_available(
        &self,
        id: Id,
        qty: u32,
        now: Timestamp,
    ) -> Result<Listing, StockError> {
        self.inner.reserve_if_available(id, qty, now).await
    }

    async fn restore(&self, id: Id, _qty: u32, _now: Timestamp) -> Result<Listing, StockError> {
        Err(StockError::Busy(id))
    }
}

#[tokio::test]
async fn cancel_surfaces_failed_restock() {
    let inner = Arc::new(MemoryListingRepository::new(Duration::from_millis(200)));
    let listings = Arc::new(StuckRestoreRepo { inner: inner.clone() });
    let orders = Arc::new(MemoryOrderRepository::new());
    let stores = Arc::new(MemoryStoreRepository::new());
    let events = EventBus::new();
    let locks = LockService::new(Arc::new(MemoryLockBackend::new()));
    let stock = ReservationEngine::new(listings.clone(), events.clone());
    let manager = OrderManager::new(
        orders,
        listings,
        stores.clone(),
        stock,
        locks,
        events,
    );

    stores
        .insert(Store::new(1, "Corner Bakery", StoreStatus::Active))
        .await
        .unwrap();
    let now = util::now_millis();
    let listing = inner
        .insert(
            ListingCreate {
                store_id: 1,
                name: "Surplus bento box".into(),
                description: None,
                image_url: None,
                original_price: Decimal::new(1050, 2),
                flash_price: Decimal::new(350, 2),
                quantity: 5,
                sale_start: now - 3_600_000,
                sale_end: now + 3_600_000,
            }
            .into_listing(now),
        )
        .await
        .unwrap();

    let order = manager
        .create_order(create_req(100, 1, vec![(listing.id, 2)]))
        .await
        .unwrap();

    let err = manager.cancel_order(order.id, None).await.unwrap_err();
    assert!(matches!(err, OrderError::Stock(StockError::Busy(_))));

    // The claim stood: order cancelled, payment voided, and a retry does
    // not re-run the restores.
    let o = manager.find_order(order.id).await.unwrap();
    assert_eq!(o.status, OrderStatus::Cancelled);
    let payment = manager.payment_for_order(order.id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Cancelled);
    let err = manager.cancel_order(order.id, None).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn errors_map_to_stable_codes() {
    let cases: Vec<(OrderError, ErrorCode)> = vec![
        (OrderError::NotFound(7), ErrorCode::OrderNotFound),
        (OrderError::EmptyOrder, ErrorCode::OrderEmpty),
        (OrderError::LockUnavailable, ErrorCode::OrderSubmitLocked),
        (OrderError::StoreNotActive(1), ErrorCode::StoreNotActive),
        (
            OrderError::CrossStore {
                listing_id: 2,
                store_id: 1,
            },
            ErrorCode::OrderCrossStore,
        ),
        (
            OrderError::Stock(StockError::Insufficient {
                listing_id: 1,
                available: 0,
                requested: 1,
            }),
            ErrorCode::InsufficientStock,
        ),
        (
            OrderError::Stock(StockError::Busy(1)),
            ErrorCode::StockBusy,
        ),
        (OrderError::PaymentNotFound(1), ErrorCode::PaymentNotFound),
        (OrderError::PaymentNotPending(1), ErrorCode::PaymentNotPending),
        (
            OrderError::NumberExists("ORD-20260830-AAAAAA".into()),
            ErrorCode::OrderNumberExists,
        ),
    ];

    for (err, code) in cases {
        let app: AppError = err.into();
        assert_eq!(app.code, code);
    }

    // Retryability rides along with the code
    let busy: AppError = OrderError::Stock(StockError::Busy(1)).into();
    assert!(busy.is_retryable());
    let insufficient: AppError = OrderError::Stock(StockError::Insufficient {
        listing_id: 1,
        available: 0,
        requested: 1,
    })
    .into();
    assert!(!insufficient.is_retryable());
}
