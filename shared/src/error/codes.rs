//! Unified error codes for the flash-sale platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Listing / stock errors
//! - 7xxx: Store errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order number already exists
    OrderNumberExists = 4002,
    /// Invalid order status transition
    InvalidOrderTransition = 4003,
    /// Order lines reference more than one store
    OrderCrossStore = 4004,
    /// Order has no lines
    OrderEmpty = 4005,
    /// Duplicate order submission in flight
    OrderSubmitLocked = 4006,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Payment is not pending
    PaymentNotPending = 5002,
    /// Payment processing failed
    PaymentFailed = 5003,

    // ==================== 6xxx: Listing / Stock ====================
    /// Listing not found
    ListingNotFound = 6001,
    /// Listing is not available for sale
    ListingNotAvailable = 6002,
    /// Insufficient stock
    InsufficientStock = 6003,
    /// Stock row busy (retryable)
    StockBusy = 6004,
    /// Stale revision on optimistic update
    RevisionConflict = 6005,
    /// Flash price must be below original price
    InvalidFlashPrice = 6006,
    /// Sale window end must be after start
    InvalidSaleWindow = 6007,

    // ==================== 7xxx: Store ====================
    /// Store not found
    StoreNotFound = 7001,
    /// Store is not accepting orders
    StoreNotActive = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Lock backend unavailable
    LockUnavailable = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default English message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::ValueOutOfRange => "Value out of range",

            Self::OrderNotFound => "Order not found",
            Self::OrderNumberExists => "Order number already exists",
            Self::InvalidOrderTransition => "Invalid order status transition",
            Self::OrderCrossStore => "All items must be from the same store",
            Self::OrderEmpty => "Order must contain at least one item",
            Self::OrderSubmitLocked => "An order submission is already in progress",

            Self::PaymentNotFound => "Payment not found",
            Self::PaymentNotPending => "Payment is not pending",
            Self::PaymentFailed => "Payment processing failed",

            Self::ListingNotFound => "Listing not found",
            Self::ListingNotAvailable => "Listing is not available for sale",
            Self::InsufficientStock => "Insufficient stock",
            Self::StockBusy => "Stock is busy, please retry",
            Self::RevisionConflict => "Listing was modified concurrently",
            Self::InvalidFlashPrice => "Flash price must be lower than original price",
            Self::InvalidSaleWindow => "Sale end time must be after start time",

            Self::StoreNotFound => "Store not found",
            Self::StoreNotActive => "Store is not currently accepting orders",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::TimeoutError => "Operation timeout",
            Self::ConfigError => "Configuration error",
            Self::LockUnavailable => "Lock backend unavailable",
        }
    }

    /// Whether a client may retry the failed operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StockBusy | Self::LockUnavailable | Self::TimeoutError | Self::DatabaseError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error for invalid error code conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            8 => Self::ValueOutOfRange,

            4001 => Self::OrderNotFound,
            4002 => Self::OrderNumberExists,
            4003 => Self::InvalidOrderTransition,
            4004 => Self::OrderCrossStore,
            4005 => Self::OrderEmpty,
            4006 => Self::OrderSubmitLocked,

            5001 => Self::PaymentNotFound,
            5002 => Self::PaymentNotPending,
            5003 => Self::PaymentFailed,

            6001 => Self::ListingNotFound,
            6002 => Self::ListingNotAvailable,
            6003 => Self::InsufficientStock,
            6004 => Self::StockBusy,
            6005 => Self::RevisionConflict,
            6006 => Self::InvalidFlashPrice,
            6007 => Self::InvalidSaleWindow,

            7001 => Self::StoreNotFound,
            7002 => Self::StoreNotActive,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9004 => Self::TimeoutError,
            9005 => Self::ConfigError,
            9101 => Self::LockUnavailable,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
