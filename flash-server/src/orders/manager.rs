//! OrderManager - order lifecycle and multi-line atomicity
//!
//! # Create Flow
//!
//! ```text
//! create_order(req)
//!     ├─ 1. Advisory submission lock (per customer)
//!     ├─ 2. Validate store + line ownership
//!     ├─ 3. Reserve stock line by line (rollback earlier lines on failure)
//!     ├─ 4. Persist Order (PENDING) + Payment (PENDING) as one unit
//!     ├─ 5. Emit OrderCreated
//!     └─ 6. Release lock, return order
//! ```
//!
//! The submission lock is advisory (duplicate-submit guard); stock
//! safety comes entirely from the reservation engine's conditional
//! commit.

use crate::db::{
    ListingRepository, OrderRepository, PaymentCas, RepoError, StatusCas, StoreRepository,
};
use crate::events::{DomainEvent, EventBus};
use crate::lock::LockService;
use crate::stock::{ReservationEngine, StockError};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderCreate, OrderLine, OrderStatus, Payment, PaymentStatus,
};
use shared::types::Id;
use shared::util;
use std::sync::Arc;
use thiserror::Error;

/// Order engine errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Id),

    #[error("Order not found: {0}")]
    NumberNotFound(String),

    #[error("Store not found: {0}")]
    StoreNotFound(Id),

    #[error("Store {0} is not accepting orders")]
    StoreNotActive(Id),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order must contain at least one line")]
    EmptyOrder,

    #[error("Listing {listing_id} does not belong to store {store_id}")]
    CrossStore { listing_id: Id, store_id: Id },

    #[error("Order number already exists: {0}")]
    NumberExists(String),

    #[error("Submission lock unavailable")]
    LockUnavailable,

    #[error("Payment not found for order {0}")]
    PaymentNotFound(Id),

    #[error("Payment for order {0} is not pending")]
    PaymentNotPending(Id),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, err.to_string())
                    .with_detail("order_id", *id)
            }
            OrderError::NumberNotFound(number) => {
                AppError::with_message(ErrorCode::OrderNotFound, err.to_string())
                    .with_detail("order_number", number.clone())
            }
            OrderError::StoreNotFound(id) => {
                AppError::with_message(ErrorCode::StoreNotFound, err.to_string())
                    .with_detail("store_id", *id)
            }
            OrderError::StoreNotActive(id) => {
                AppError::with_message(ErrorCode::StoreNotActive, err.to_string())
                    .with_detail("store_id", *id)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::InvalidOrderTransition, err.to_string())
                    .with_detail("from", from.to_string())
                    .with_detail("to", to.to_string())
            }
            OrderError::EmptyOrder => AppError::new(ErrorCode::OrderEmpty),
            OrderError::CrossStore {
                listing_id,
                store_id,
            } => AppError::with_message(ErrorCode::OrderCrossStore, err.to_string())
                .with_detail("listing_id", *listing_id)
                .with_detail("store_id", *store_id),
            OrderError::NumberExists(number) => {
                AppError::with_message(ErrorCode::OrderNumberExists, err.to_string())
                    .with_detail("order_number", number.clone())
            }
            OrderError::LockUnavailable => AppError::new(ErrorCode::OrderSubmitLocked),
            OrderError::PaymentNotFound(_) => {
                AppError::with_message(ErrorCode::PaymentNotFound, err.to_string())
            }
            OrderError::PaymentNotPending(_) => {
                AppError::with_message(ErrorCode::PaymentNotPending, err.to_string())
            }
            OrderError::Stock(stock) => {
                let code = match stock {
                    StockError::Insufficient { .. } => ErrorCode::InsufficientStock,
                    StockError::NotAvailable(_) => ErrorCode::ListingNotAvailable,
                    StockError::NotFound(_) => ErrorCode::ListingNotFound,
                    StockError::Busy(_) => ErrorCode::StockBusy,
                    StockError::InvalidQuantity(_) => ErrorCode::ValidationFailed,
                };
                AppError::with_message(code, err.to_string())
            }
            OrderError::Repo(RepoError::Duplicate(_)) => {
                AppError::with_message(ErrorCode::AlreadyExists, err.to_string())
            }
            OrderError::Repo(_) => AppError::with_message(ErrorCode::DatabaseError, err.to_string()),
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

/// Order engine
#[derive(Clone)]
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    listings: Arc<dyn ListingRepository>,
    stores: Arc<dyn StoreRepository>,
    stock: ReservationEngine,
    locks: LockService,
    events: EventBus,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        listings: Arc<dyn ListingRepository>,
        stores: Arc<dyn StoreRepository>,
        stock: ReservationEngine,
        locks: LockService,
        events: EventBus,
    ) -> Self {
        Self {
            orders,
            listings,
            stores,
            stock,
            locks,
            events,
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an order, reserving stock for every line atomically.
    ///
    /// All-or-nothing across listings: if any line fails, every line
    /// reserved earlier in this call is restored before the error
    /// surfaces.
    pub async fn create_order(&self, req: OrderCreate) -> OrderResult<Order> {
        // Advisory duplicate-submit guard; transient failure class for
        // the caller, unrelated to stock.
        let lock_key = format!("order:submit:{}", req.customer_id);
        let owner = LockService::owner_token();
        if !self.locks.try_acquire_default(&lock_key, &owner).await {
            return Err(OrderError::LockUnavailable);
        }

        let result = self.create_order_inner(req).await;
        self.locks.release(&lock_key, &owner).await;
        result
    }

    async fn create_order_inner(&self, req: OrderCreate) -> OrderResult<Order> {
        tracing::info!(store_id = req.store_id, customer_id = req.customer_id, "Creating order");

        if req.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let store = self
            .stores
            .find_by_id(req.store_id)
            .await?
            .ok_or(OrderError::StoreNotFound(req.store_id))?;
        if !store.status.accepts_orders() {
            return Err(OrderError::StoreNotActive(store.id));
        }

        // Reserve line by line; remember what succeeded for rollback
        let mut reserved: Vec<(Id, u32)> = Vec::with_capacity(req.lines.len());
        let mut lines: Vec<OrderLine> = Vec::with_capacity(req.lines.len());
        let mut total_amount = Decimal::ZERO;

        for input in &req.lines {
            let listing = match self.listings.find_by_id(input.listing_id).await {
                Ok(Some(l)) => l,
                Ok(None) => {
                    self.rollback(&reserved).await;
                    return Err(StockError::NotFound(input.listing_id).into());
                }
                Err(e) => {
                    self.rollback(&reserved).await;
                    return Err(e.into());
                }
            };
            if listing.store_id != store.id {
                self.rollback(&reserved).await;
                return Err(OrderError::CrossStore {
                    listing_id: listing.id,
                    store_id: store.id,
                });
            }

            let snapshot = match self.stock.reserve(input.listing_id, input.quantity).await {
                Ok(s) => s,
                Err(e) => {
                    self.rollback(&reserved).await;
                    return Err(e.into());
                }
            };
            reserved.push((input.listing_id, input.quantity));

            let subtotal = snapshot.flash_price * Decimal::from(input.quantity);
            total_amount += subtotal;
            lines.push(OrderLine {
                listing_id: snapshot.id,
                name: snapshot.name,
                quantity: input.quantity,
                unit_price: snapshot.flash_price,
                subtotal,
            });
        }

        let now = util::now_millis();
        let order = Order {
            id: util::snowflake_id(),
            order_number: util::generate_order_number(),
            customer_id: req.customer_id,
            store_id: req.store_id,
            lines,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: req.payment_method,
            pickup_time: req.pickup_time,
            special_instructions: req.special_instructions,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
        };
        let payment = Payment::pending(order.id, total_amount, req.payment_method, now);

        // Persist order + payment as one unit; reservations roll back on
        // any failure, including an order-number collision.
        if let Err(e) = self.orders.create_with_payment(order.clone(), payment).await {
            self.rollback(&reserved).await;
            return Err(match e {
                RepoError::Duplicate(_) => OrderError::NumberExists(order.order_number.clone()),
                other => other.into(),
            });
        }

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "Order created"
        );
        self.events.emit(DomainEvent::OrderCreated {
            order_id: order.id,
            store_id: order.store_id,
            customer_id: order.customer_id,
        });
        Ok(order)
    }

    /// Restore every line reserved earlier in a failed create call
    async fn rollback(&self, reserved: &[(Id, u32)]) {
        for (listing_id, qty) in reserved {
            if let Err(e) = self.stock.restore(*listing_id, *qty).await {
                // NotFound here means the listing was soft-deleted while
                // the order was in flight; nothing left to restore into.
                tracing::error!(listing_id, qty, error = %e, "Failed to roll back reservation");
            }
        }
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel a pending order, restoring stock for every line.
    pub async fn cancel_order(&self, order_id: Id, reason: Option<String>) -> OrderResult<Order> {
        let now = util::now_millis();

        // Claim the cancellation first: the CAS makes the restore below
        // happen exactly once even when two cancels race.
        let order = match self.orders.cancel(order_id, reason, now).await? {
            StatusCas::Applied(order) => order,
            StatusCas::Mismatch(actual) => {
                return Err(OrderError::InvalidTransition {
                    from: actual,
                    to: OrderStatus::Cancelled,
                });
            }
        };

        // The claim stands even if a restore fails: re-running the CAS
        // would double-restore the other lines. NotFound means the
        // listing was soft-deleted in flight; nothing left to restore
        // into. Any other failure surfaces after the payment and event
        // work below so the caller knows stock may be short.
        let mut restore_failure: Option<StockError> = None;
        for line in &order.lines {
            if let Err(e) = self.stock.restore(line.listing_id, line.quantity).await {
                tracing::error!(
                    order_id,
                    listing_id = line.listing_id,
                    error = %e,
                    "Failed to restore stock for cancelled order line"
                );
                if !matches!(e, StockError::NotFound(_)) && restore_failure.is_none() {
                    restore_failure = Some(e);
                }
            }
        }

        // Cancel the payment through the CAS; one that already settled
        // (paid before the cancel landed) is left untouched.
        match self
            .orders
            .transition_payment(
                order_id,
                PaymentStatus::Pending,
                PaymentStatus::Cancelled,
                None,
                None,
            )
            .await
        {
            Ok(PaymentCas::Applied(_)) => {}
            Ok(PaymentCas::Mismatch(actual)) => {
                tracing::warn!(order_id, payment_status = ?actual, "Payment already settled; leaving it");
            }
            Err(RepoError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(order_id, order_number = %order.order_number, "Order cancelled");
        self.events.emit(DomainEvent::OrderCancelled {
            order_id: order.id,
            store_id: order.store_id,
        });
        if let Some(e) = restore_failure {
            return Err(e.into());
        }
        Ok(order)
    }

    // ========================================================================
    // Store-driven pipeline
    // ========================================================================

    async fn transition(
        &self,
        order_id: Id,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> OrderResult<Order> {
        match self.orders.cas_status(order_id, expected, next).await? {
            StatusCas::Applied(order) => {
                tracing::info!(order_id, status = %next, "Order status updated");
                Ok(order)
            }
            StatusCas::Mismatch(actual) => Err(OrderError::InvalidTransition {
                from: actual,
                to: next,
            }),
        }
    }

    /// PENDING -> CONFIRMED
    pub async fn confirm_order(&self, order_id: Id) -> OrderResult<Order> {
        let order = self
            .transition(order_id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await?;
        self.events.emit(DomainEvent::OrderConfirmed { order_id });
        Ok(order)
    }

    /// CONFIRMED -> PREPARING
    pub async fn start_preparing(&self, order_id: Id) -> OrderResult<Order> {
        let order = self
            .transition(order_id, OrderStatus::Confirmed, OrderStatus::Preparing)
            .await?;
        self.events.emit(DomainEvent::OrderPreparing { order_id });
        Ok(order)
    }

    /// PREPARING -> READY
    pub async fn mark_ready(&self, order_id: Id) -> OrderResult<Order> {
        let order = self
            .transition(order_id, OrderStatus::Preparing, OrderStatus::Ready)
            .await?;
        self.events.emit(DomainEvent::OrderReady {
            order_id,
            customer_id: order.customer_id,
        });
        Ok(order)
    }

    /// READY -> COMPLETED
    pub async fn complete_order(&self, order_id: Id) -> OrderResult<Order> {
        let order = self
            .transition(order_id, OrderStatus::Ready, OrderStatus::Completed)
            .await?;
        self.events.emit(DomainEvent::OrderCompleted { order_id });
        Ok(order)
    }

    // ========================================================================
    // Payment
    // ========================================================================

    /// Process the pending payment for an order.
    ///
    /// The gateway is modeled as an abstract "mark paid" effect;
    /// independent of the order pipeline position.
    pub async fn process_payment(&self, order_id: Id) -> OrderResult<Payment> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        // Pending -> Paid through the repository CAS: a racing cancel
        // and this capture can never both settle the payment.
        let payment = match self
            .orders
            .transition_payment(
                order_id,
                PaymentStatus::Pending,
                PaymentStatus::Paid,
                Some(uuid::Uuid::new_v4().to_string()),
                Some(util::now_millis()),
            )
            .await
        {
            Ok(PaymentCas::Applied(payment)) => payment,
            Ok(PaymentCas::Mismatch(_)) => return Err(OrderError::PaymentNotPending(order_id)),
            Err(RepoError::NotFound(_)) => return Err(OrderError::PaymentNotFound(order_id)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(order_id, "Payment processed");
        self.events.emit(DomainEvent::PaymentProcessed {
            order_id,
            success: true,
        });
        Ok(payment)
    }

    /// Mark the pending payment failed (gateway rejection path)
    pub async fn fail_payment(&self, order_id: Id) -> OrderResult<Payment> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let payment = match self
            .orders
            .transition_payment(
                order_id,
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                None,
                None,
            )
            .await
        {
            Ok(PaymentCas::Applied(payment)) => payment,
            Ok(PaymentCas::Mismatch(_)) => return Err(OrderError::PaymentNotPending(order_id)),
            Err(RepoError::NotFound(_)) => return Err(OrderError::PaymentNotFound(order_id)),
            Err(e) => return Err(e.into()),
        };

        tracing::warn!(order_id, "Payment failed");
        self.events.emit(DomainEvent::PaymentProcessed {
            order_id,
            success: false,
        });
        Ok(payment)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn find_order(&self, order_id: Id) -> OrderResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    pub async fn find_by_number(&self, order_number: &str) -> OrderResult<Order> {
        self.orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| OrderError::NumberNotFound(order_number.to_string()))
    }

    pub async fn orders_for_customer(
        &self,
        customer_id: Id,
        status: Option<OrderStatus>,
    ) -> OrderResult<Vec<Order>> {
        let mut orders = self.orders.find_by_customer(customer_id).await?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        Ok(orders)
    }

    pub async fn orders_for_store(
        &self,
        store_id: Id,
        status: Option<OrderStatus>,
    ) -> OrderResult<Vec<Order>> {
        let mut orders = self.orders.find_by_store(store_id).await?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        Ok(orders)
    }

    pub async fn payment_for_order(&self, order_id: Id) -> OrderResult<Payment> {
        self.orders
            .payment_for_order(order_id)
            .await?
            .ok_or(OrderError::PaymentNotFound(order_id))
    }
}
