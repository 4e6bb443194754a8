//! Payment Model — one-to-one with an order

use crate::types::{Id, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Pay at pickup
    #[default]
    Cash,
    Card,
    Wallet,
    BankTransfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::BankTransfer => "bank_transfer",
        };
        write!(f, "{}", s)
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    Cancelled,
}

/// Payment record
///
/// Created in `Pending` state in the same unit of work as its order;
/// mutated only by payment processing or order cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Id,
    /// Owning order (unique — exactly one payment per order)
    pub order_id: Id,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// External gateway reference, set when processed
    pub transaction_id: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Payment {
    pub fn pending(order_id: Id, amount: Decimal, method: PaymentMethod, now: Timestamp) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            order_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            paid_at: None,
            created_at: now,
        }
    }
}
