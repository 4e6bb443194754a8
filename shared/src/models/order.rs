//! Order Model — a customer's reservation against one store's listings

use crate::types::{Id, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::PaymentMethod;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, stock reserved, waiting for confirmation
    #[default]
    Pending,
    /// Accepted by the store
    Confirmed,
    /// Store is preparing the order
    Preparing,
    /// Ready for pickup
    Ready,
    /// Picked up
    Completed,
    /// Cancelled by the customer (terminal)
    Cancelled,
    /// Pickup window elapsed (terminal, scheduler-driven)
    Expired,
}

impl OrderStatus {
    /// Adjacency table of the order state machine.
    ///
    /// Happy path is strictly linear; `Cancelled` is reachable only from
    /// `Pending`, `Expired` only from `Preparing`/`Ready` (the sweep).
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, Completed)
                | (Pending, Cancelled)
                | (Preparing, Expired)
                | (Ready, Expired)
        )
    }

    /// Terminal states accept no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Order line
///
/// `unit_price` is the listing's flash price frozen at reservation time;
/// `subtotal = unit_price * quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Listing reference (not owned; a listing outlives its orders)
    pub listing_id: Id,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Order entity
///
/// Owns its lines and (by id) its one-to-one payment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    /// Globally-unique human-legible token, `ORD-YYYYMMDD-XXXXXX`
    pub order_number: String,
    pub customer_id: Id,
    pub store_id: Id,
    pub lines: Vec<OrderLine>,
    /// Sum of line subtotals
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub pickup_time: Timestamp,
    pub special_instructions: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A requested line before reservation (input to order creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub listing_id: Id,
    pub quantity: u32,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub customer_id: Id,
    pub store_id: Id,
    pub lines: Vec<OrderLineInput>,
    pub payment_method: PaymentMethod,
    pub pickup_time: Timestamp,
    pub special_instructions: Option<String>,
}
