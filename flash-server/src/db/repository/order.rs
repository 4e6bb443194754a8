//! Order Repository
//!
//! Orders and their one-to-one payments live behind one seam so the
//! create path can persist both as a single unit. The order number is a
//! unique index: a duplicate insert is a conflict, never an overwrite.

use super::{PaymentCas, RepoError, RepoResult, StatusCas};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared::models::{Order, OrderStatus, Payment, PaymentStatus};
use shared::types::{Id, Timestamp};
use std::sync::Arc;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order and its payment as one unit
    async fn create_with_payment(&self, order: Order, payment: Payment) -> RepoResult<()>;

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Order>>;

    async fn find_by_number(&self, order_number: &str) -> RepoResult<Option<Order>>;

    async fn find_by_customer(&self, customer_id: Id) -> RepoResult<Vec<Order>>;

    async fn find_by_store(&self, store_id: Id) -> RepoResult<Vec<Order>>;

    /// Compare-and-set the order status; check and write share the row's
    /// exclusive section.
    async fn cas_status(
        &self,
        id: Id,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> RepoResult<StatusCas>;

    /// Pending -> Cancelled with reason and timestamp, same CAS discipline
    async fn cancel(
        &self,
        id: Id,
        reason: Option<String>,
        now: Timestamp,
    ) -> RepoResult<StatusCas>;

    /// Ids of Ready/Preparing orders whose pickup time is before `cutoff`
    async fn find_pickup_expired(&self, cutoff: Timestamp) -> RepoResult<Vec<Id>>;

    /// Idempotent Ready/Preparing -> Expired; true when the row changed
    async fn expire(&self, id: Id, cutoff: Timestamp) -> RepoResult<bool>;

    async fn payment_for_order(&self, order_id: Id) -> RepoResult<Option<Payment>>;

    /// Compare-and-set the payment status; check and write share the
    /// payment row's exclusive section. `transaction_id` and `paid_at`
    /// are applied only when the CAS applies.
    async fn transition_payment(
        &self,
        order_id: Id,
        expected: PaymentStatus,
        next: PaymentStatus,
        transaction_id: Option<String>,
        paid_at: Option<Timestamp>,
    ) -> RepoResult<PaymentCas>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

pub struct MemoryOrderRepository {
    rows: DashMap<Id, Arc<Mutex<Order>>>,
    /// Unique index: order_number -> order id
    by_number: DashMap<String, Id>,
    /// One payment per order, keyed by order id
    payments: DashMap<Id, Payment>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            by_number: DashMap::new(),
            payments: DashMap::new(),
        }
    }

    fn row(&self, id: Id) -> Option<Arc<Mutex<Order>>> {
        self.rows.get(&id).map(|r| r.value().clone())
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_with_payment(&self, order: Order, payment: Payment) -> RepoResult<()> {
        use dashmap::mapref::entry::Entry;

        // Claim the unique order number first; losing the claim is a
        // conflict surfaced to the caller.
        match self.by_number.entry(order.order_number.clone()) {
            Entry::Occupied(_) => {
                return Err(RepoError::Duplicate(format!(
                    "order number {}",
                    order.order_number
                )));
            }
            Entry::Vacant(e) => {
                e.insert(order.id);
            }
        }

        match self.rows.entry(order.id) {
            Entry::Occupied(_) => {
                self.by_number.remove(&order.order_number);
                Err(RepoError::Duplicate(format!("order {}", order.id)))
            }
            Entry::Vacant(e) => {
                self.payments.insert(order.id, payment);
                e.insert(Arc::new(Mutex::new(order)));
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Order>> {
        Ok(self.row(id).map(|row| row.lock().clone()))
    }

    async fn find_by_number(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let id = match self.by_number.get(order_number) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.find_by_id(id).await
    }

    async fn find_by_customer(&self, customer_id: Id) -> RepoResult<Vec<Order>> {
        let mut found: Vec<Order> = self
            .rows
            .iter()
            .map(|r| r.value().lock().clone())
            .filter(|o| o.customer_id == customer_id)
            .collect();
        found.sort_by_key(|o| o.created_at);
        Ok(found)
    }

    async fn find_by_store(&self, store_id: Id) -> RepoResult<Vec<Order>> {
        let mut found: Vec<Order> = self
            .rows
            .iter()
            .map(|r| r.value().lock().clone())
            .filter(|o| o.store_id == store_id)
            .collect();
        found.sort_by_key(|o| o.created_at);
        Ok(found)
    }

    async fn cas_status(
        &self,
        id: Id,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> RepoResult<StatusCas> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("order {}", id)))?;
        let mut guard = row.lock();

        if guard.status != expected {
            return Ok(StatusCas::Mismatch(guard.status));
        }
        guard.status = next;
        Ok(StatusCas::Applied(guard.clone()))
    }

    async fn cancel(
        &self,
        id: Id,
        reason: Option<String>,
        now: Timestamp,
    ) -> RepoResult<StatusCas> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("order {}", id)))?;
        let mut guard = row.lock();

        if guard.status != OrderStatus::Pending {
            return Ok(StatusCas::Mismatch(guard.status));
        }
        guard.status = OrderStatus::Cancelled;
        guard.cancellation_reason = reason;
        guard.cancelled_at = Some(now);
        Ok(StatusCas::Applied(guard.clone()))
    }

    async fn find_pickup_expired(&self, cutoff: Timestamp) -> RepoResult<Vec<Id>> {
        Ok(self
            .rows
            .iter()
            .filter_map(|r| {
                let o = r.value().lock();
                (matches!(o.status, OrderStatus::Ready | OrderStatus::Preparing)
                    && o.pickup_time < cutoff)
                    .then_some(o.id)
            })
            .collect())
    }

    async fn expire(&self, id: Id, cutoff: Timestamp) -> RepoResult<bool> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("order {}", id)))?;
        let mut guard = row.lock();

        if !matches!(guard.status, OrderStatus::Ready | OrderStatus::Preparing) {
            return Ok(false);
        }
        if guard.pickup_time >= cutoff {
            return Ok(false);
        }
        guard.status = OrderStatus::Expired;
        Ok(true)
    }

    async fn payment_for_order(&self, order_id: Id) -> RepoResult<Option<Payment>> {
        Ok(self.payments.get(&order_id).map(|p| p.clone()))
    }

    async fn transition_payment(
        &self,
        order_id: Id,
        expected: PaymentStatus,
        next: PaymentStatus,
        transaction_id: Option<String>,
        paid_at: Option<Timestamp>,
    ) -> RepoResult<PaymentCas> {
        // get_mut holds the shard write lock for the whole check+write
        let mut payment = self
            .payments
            .get_mut(&order_id)
            .ok_or_else(|| RepoError::NotFound(format!("payment for order {}", order_id)))?;

        if payment.status != expected {
            return Ok(PaymentCas::Mismatch(payment.status));
        }
        payment.status = next;
        if transaction_id.is_some() {
            payment.transaction_id = transaction_id;
        }
        if paid_at.is_some() {
            payment.paid_at = paid_at;
        }
        Ok(PaymentCas::Applied(payment.clone()))
    }
}
