//! Listing Model — a store's time-boxed discounted offer

use crate::types::{Id, Timestamp};
use crate::util;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Listing status
///
/// `Deleted` is a terminal soft-delete and overrides every other status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    /// Sale window not yet open
    #[default]
    Pending,
    /// Purchasable
    Available,
    /// `available_quantity` reached zero
    SoldOut,
    /// Sale window elapsed
    Expired,
    /// Withdrawn by the store
    Cancelled,
    /// Soft-deleted, terminal
    Deleted,
}

impl ListingStatus {
    /// Terminal states never leave via any mutation path
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingStatus::Expired | ListingStatus::Cancelled | ListingStatus::Deleted
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Available => "available",
            ListingStatus::SoldOut => "sold_out",
            ListingStatus::Expired => "expired",
            ListingStatus::Cancelled => "cancelled",
            ListingStatus::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// Listing entity
///
/// Stock invariant: `0 <= available_quantity <= total_quantity` at all
/// times; `SoldOut` implies `available_quantity == 0`. The only mutators
/// of `available_quantity` are the repository's conditional
/// reserve/restore primitives. Non-stock fields change through the
/// optimistic `revision` check instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Id,
    /// Owning store (non-owning back-reference)
    pub store_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub original_price: Decimal,
    pub flash_price: Decimal,
    /// Derived from the two prices at creation time
    pub discount_percent: u8,
    /// Immutable baseline, never changes after creation
    pub total_quantity: u32,
    pub available_quantity: u32,
    /// Sale window [sale_start, sale_end) in Unix millis
    pub sale_start: Timestamp,
    pub sale_end: Timestamp,
    pub status: ListingStatus,
    pub is_expired: bool,
    /// Monotonic revision for optimistic non-stock updates
    pub revision: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Listing {
    /// Whether `now` falls inside the sale window
    pub fn in_sale_window(&self, now: Timestamp) -> bool {
        now >= self.sale_start && now < self.sale_end
    }

    /// Whether a reservation may be attempted right now
    pub fn is_reservable(&self, now: Timestamp) -> bool {
        self.status == ListingStatus::Available && !self.is_expired && self.in_sale_window(now)
    }

    /// Initial status for a freshly created listing
    pub fn initial_status(sale_start: Timestamp, quantity: u32, now: Timestamp) -> ListingStatus {
        if quantity == 0 {
            ListingStatus::SoldOut
        } else if now >= sale_start {
            ListingStatus::Available
        } else {
            ListingStatus::Pending
        }
    }
}

/// Create listing payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCreate {
    pub store_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub original_price: Decimal,
    pub flash_price: Decimal,
    pub quantity: u32,
    pub sale_start: Timestamp,
    pub sale_end: Timestamp,
}

impl ListingCreate {
    /// Build the entity, deriving status and discount
    pub fn into_listing(self, now: Timestamp) -> Listing {
        let status = Listing::initial_status(self.sale_start, self.quantity, now);
        Listing {
            id: util::snowflake_id(),
            store_id: self.store_id,
            discount_percent: util::discount_percent(self.original_price, self.flash_price),
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            original_price: self.original_price,
            flash_price: self.flash_price,
            total_quantity: self.quantity,
            available_quantity: self.quantity,
            sale_start: self.sale_start,
            sale_end: self.sale_end,
            status,
            is_expired: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Update listing payload (non-stock fields only)
///
/// Applied with an optimistic revision compare; never touches
/// `available_quantity` or `total_quantity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub original_price: Option<Decimal>,
    pub flash_price: Option<Decimal>,
}
