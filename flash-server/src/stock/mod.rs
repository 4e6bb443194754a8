//! Stock Reservation Engine
//!
//! Thin, race-free facade over the listing repository's conditional
//! stock primitives. All quantity checks happen inside the row's
//! exclusive section at commit time — the engine never trusts a quantity
//! it read before taking the row.

use crate::db::ListingRepository;
use crate::events::{DomainEvent, EventBus};
use shared::models::{Listing, ListingStatus};
use shared::types::Id;
use shared::util;
use std::sync::Arc;
use thiserror::Error;

/// Stock errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Less stock than requested at commit time
    #[error(
        "insufficient stock for listing {listing_id}: available {available}, requested {requested}"
    )]
    Insufficient {
        listing_id: Id,
        available: u32,
        requested: u32,
    },

    /// Listing not purchasable (status, expiry flag or sale window)
    #[error("listing {0} is not available for sale")]
    NotAvailable(Id),

    #[error("listing not found: {0}")]
    NotFound(Id),

    /// Row lock not acquired within the bounded wait; retryable
    #[error("stock row busy for listing {0}")]
    Busy(Id),

    /// Quantity must be at least one unit
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),
}

impl StockError {
    /// Transient failures the caller may retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Busy(_))
    }
}

pub type StockResult<T> = Result<T, StockError>;

/// Reservation engine
///
/// The only component allowed to drive the repository's
/// `reserve_if_available` / `restore` primitives.
#[derive(Clone)]
pub struct ReservationEngine {
    listings: Arc<dyn ListingRepository>,
    events: EventBus,
}

impl ReservationEngine {
    pub fn new(listings: Arc<dyn ListingRepository>, events: EventBus) -> Self {
        Self { listings, events }
    }

    /// Reserve `qty` units of a listing.
    ///
    /// Returns the listing snapshot after the decrement. Emits
    /// `ListingSoldOut` when this reservation took the last units.
    pub async fn reserve(&self, listing_id: Id, qty: u32) -> StockResult<Listing> {
        if qty == 0 {
            return Err(StockError::InvalidQuantity(qty));
        }

        let now = util::now_millis();
        let listing = self
            .listings
            .reserve_if_available(listing_id, qty, now)
            .await?;

        tracing::debug!(
            listing_id,
            qty,
            remaining = listing.available_quantity,
            "Stock reserved"
        );

        if listing.status == ListingStatus::SoldOut {
            tracing::info!(listing_id, "Listing sold out");
            self.events.emit(DomainEvent::ListingSoldOut { listing_id });
        }
        Ok(listing)
    }

    /// Return `qty` units to a listing (cancellation / rollback path).
    ///
    /// Clamped at `total_quantity`; never fails on row contention.
    pub async fn restore(&self, listing_id: Id, qty: u32) -> StockResult<Listing> {
        if qty == 0 {
            return Err(StockError::InvalidQuantity(qty));
        }

        let now = util::now_millis();
        let listing = self.listings.restore(listing_id, qty, now).await?;
        tracing::debug!(
            listing_id,
            qty,
            available = listing.available_quantity,
            "Stock restored"
        );
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryListingRepository;
    use rust_decimal_macros::dec;
    use shared::models::ListingCreate;
    use std::time::Duration;

    fn engine() -> (ReservationEngine, Arc<MemoryListingRepository>) {
        let repo = Arc::new(MemoryListingRepository::new(Duration::from_millis(200)));
        let engine = ReservationEngine::new(repo.clone(), EventBus::new());
        (engine, repo)
    }

    async fn seed(repo: &MemoryListingRepository, total: u32) -> Listing {
        let now = util::now_millis();
        repo.insert(
            ListingCreate {
                store_id: 1,
                name: "End-of-day pastries".into(),
                description: None,
                image_url: None,
                original_price: dec!(10.00),
                flash_price: dec!(3.00),
                quantity: total,
                sale_start: now - 3_600_000,
                sale_end: now + 3_600_000,
            }
            .into_listing(now),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn no_oversell_under_concurrency() {
        let (engine, repo) = engine();
        let listing = seed(&repo, 10).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let engine = engine.clone();
            let id = listing.id;
            handles.push(tokio::spawn(async move { engine.reserve(id, 1).await }));
        }

        let mut ok = 0;
        let mut insufficient = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StockError::Insufficient { .. }) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 10);
        assert_eq!(insufficient, 10);
        let after = repo.find_by_id(listing.id).await.unwrap().unwrap();
        assert_eq!(after.available_quantity, 0);
        assert_eq!(after.status, ListingStatus::SoldOut);
    }

    #[tokio::test]
    async fn competing_bulk_reserves_one_winner() {
        let (engine, repo) = engine();
        let listing = seed(&repo, 10).await;

        let a = {
            let engine = engine.clone();
            let id = listing.id;
            tokio::spawn(async move { engine.reserve(id, 6).await })
        };
        let b = {
            let engine = engine.clone();
            let id = listing.id;
            tokio::spawn(async move { engine.reserve(id, 6).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let after = repo.find_by_id(listing.id).await.unwrap().unwrap();
        assert_eq!(after.available_quantity, 4);
        assert_eq!(after.status, ListingStatus::Available);
    }

    #[tokio::test]
    async fn sold_out_emits_event() {
        let (engine, repo) = engine();
        let listing = seed(&repo, 2).await;
        let mut rx = engine.events.subscribe();

        engine.reserve(listing.id, 2).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::ListingSoldOut {
                listing_id: listing.id
            }
        );
    }

    #[tokio::test]
    async fn zero_quantity_rejected() {
        let (engine, repo) = engine();
        let listing = seed(&repo, 2).await;
        assert!(matches!(
            engine.reserve(listing.id, 0).await,
            Err(StockError::InvalidQuantity(0))
        ));
        assert!(matches!(
            engine.restore(listing.id, 0).await,
            Err(StockError::InvalidQuantity(0))
        ));
    }
}
