//! Repository Module
//!
//! Trait seams for the stores the engine mutates, with in-memory
//! implementations. The listing repository owns the only two operations
//! allowed to touch `available_quantity`.

// Catalog
pub mod listing;
pub mod store;

// Orders
pub mod order;

// Notifications
pub mod notification;

// Re-exports
pub use listing::{ListingRepository, MemoryListingRepository};
pub use notification::{MemoryNotificationRepository, NotificationRepository};
pub use order::{MemoryOrderRepository, OrderRepository};
pub use store::{MemoryStoreRepository, StoreRepository};

use shared::models::{Order, OrderStatus, Payment, PaymentStatus};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Stale revision: expected {expected}, actual {actual}")]
    StaleRevision { expected: u64, actual: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Outcome of a compare-and-set status write
///
/// The status CAS is the repository-level primitive the order state
/// machine is built on: the expected-state check and the write happen
/// inside the same row-exclusive section, so two concurrent transitions
/// on one order can never both apply.
#[derive(Debug)]
pub enum StatusCas {
    /// Expected state matched; returns the updated order
    Applied(Order),
    /// Row was in a different state; nothing written
    Mismatch(OrderStatus),
}

/// Outcome of a compare-and-set payment write
///
/// Same discipline as [`StatusCas`]: payments only leave `Pending` via
/// this primitive, so a racing cancel and payment capture cannot both
/// settle the same payment.
#[derive(Debug)]
pub enum PaymentCas {
    /// Expected state matched; returns the updated payment
    Applied(Payment),
    /// Payment was in a different state; nothing written
    Mismatch(PaymentStatus),
}
