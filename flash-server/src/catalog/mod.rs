//! Catalog Service
//!
//! Store and listing management: validated listing creation, optimistic
//! non-stock updates, cancel and soft-delete. Stock quantities are out
//! of scope here — only the reservation engine touches those.

use crate::db::{ListingRepository, RepoError, StoreRepository};
use crate::events::{DomainEvent, EventBus};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Listing, ListingCreate, ListingStatus, ListingUpdate, Store, StoreStatus,
};
use shared::types::Id;
use shared::util;
use std::sync::Arc;
use thiserror::Error;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Listing not found: {0}")]
    NotFound(Id),

    #[error("Store not found: {0}")]
    StoreNotFound(Id),

    #[error("Flash price {flash} must be positive and below original price {original}")]
    InvalidFlashPrice { original: Decimal, flash: Decimal },

    #[error("Sale window end {end} must be after start {start}")]
    InvalidSaleWindow { start: i64, end: i64 },

    #[error("Listing {0} was modified concurrently (expected revision {1}, actual {2})")]
    RevisionConflict(Id, u64, u64),

    #[error("Listing {0} is {1} and cannot change")]
    Terminal(Id, ListingStatus),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match &err {
            CatalogError::NotFound(id) => {
                AppError::with_message(ErrorCode::ListingNotFound, err.to_string())
                    .with_detail("listing_id", *id)
            }
            CatalogError::StoreNotFound(id) => {
                AppError::with_message(ErrorCode::StoreNotFound, err.to_string())
                    .with_detail("store_id", *id)
            }
            CatalogError::InvalidFlashPrice { .. } => {
                AppError::with_message(ErrorCode::InvalidFlashPrice, err.to_string())
            }
            CatalogError::InvalidSaleWindow { .. } => {
                AppError::with_message(ErrorCode::InvalidSaleWindow, err.to_string())
            }
            CatalogError::RevisionConflict(_, expected, actual) => {
                AppError::with_message(ErrorCode::RevisionConflict, err.to_string())
                    .with_detail("expected", *expected)
                    .with_detail("actual", *actual)
            }
            CatalogError::Terminal(..) => {
                AppError::with_message(ErrorCode::ListingNotAvailable, err.to_string())
            }
            CatalogError::Repo(RepoError::NotFound(_)) => {
                AppError::with_message(ErrorCode::NotFound, err.to_string())
            }
            CatalogError::Repo(_) => {
                AppError::with_message(ErrorCode::DatabaseError, err.to_string())
            }
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Clone)]
pub struct CatalogService {
    listings: Arc<dyn ListingRepository>,
    stores: Arc<dyn StoreRepository>,
    events: EventBus,
}

impl CatalogService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        stores: Arc<dyn StoreRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            listings,
            stores,
            events,
        }
    }

    // ========================================================================
    // Stores
    // ========================================================================

    pub async fn create_store(&self, name: impl Into<String>) -> CatalogResult<Store> {
        let store = Store::new(util::snowflake_id(), name, StoreStatus::PendingApproval);
        let store = self.stores.insert(store).await?;
        tracing::info!(store_id = store.id, name = %store.name, "Store created");
        Ok(store)
    }

    pub async fn set_store_status(&self, id: Id, status: StoreStatus) -> CatalogResult<Store> {
        let store = match self.stores.set_status(id, status).await {
            Ok(s) => s,
            Err(RepoError::NotFound(_)) => return Err(CatalogError::StoreNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(store_id = id, "Store status updated");
        Ok(store)
    }

    pub async fn find_store(&self, id: Id) -> CatalogResult<Store> {
        self.stores
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::StoreNotFound(id))
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Create a listing after price and window validation.
    ///
    /// `0 < flash_price < original_price` and `sale_start < sale_end`.
    pub async fn create_listing(&self, req: ListingCreate) -> CatalogResult<Listing> {
        self.stores
            .find_by_id(req.store_id)
            .await?
            .ok_or(CatalogError::StoreNotFound(req.store_id))?;

        Self::validate_prices(req.original_price, req.flash_price)?;
        if req.sale_end <= req.sale_start {
            return Err(CatalogError::InvalidSaleWindow {
                start: req.sale_start,
                end: req.sale_end,
            });
        }

        let now = util::now_millis();
        let listing = self.listings.insert(req.into_listing(now)).await?;

        tracing::info!(
            listing_id = listing.id,
            store_id = listing.store_id,
            quantity = listing.total_quantity,
            discount = listing.discount_percent,
            "Listing created"
        );
        self.events.emit(DomainEvent::ListingCreated {
            listing_id: listing.id,
            store_id: listing.store_id,
        });
        Ok(listing)
    }

    /// Update non-stock fields through the optimistic revision check
    pub async fn update_listing(
        &self,
        id: Id,
        update: ListingUpdate,
        expected_revision: u64,
    ) -> CatalogResult<Listing> {
        let current = self
            .listings
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        if current.status.is_terminal() {
            return Err(CatalogError::Terminal(id, current.status));
        }

        // Validate the would-be price pair before writing
        let original = update.original_price.unwrap_or(current.original_price);
        let flash = update.flash_price.unwrap_or(current.flash_price);
        Self::validate_prices(original, flash)?;

        match self
            .listings
            .update_with_revision(id, update, expected_revision)
            .await
        {
            Ok(listing) => Ok(listing),
            Err(RepoError::StaleRevision { expected, actual }) => {
                Err(CatalogError::RevisionConflict(id, expected, actual))
            }
            Err(RepoError::NotFound(_)) => Err(CatalogError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Withdraw a listing from sale
    pub async fn cancel_listing(&self, id: Id) -> CatalogResult<Listing> {
        let current = self
            .listings
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        if current.status.is_terminal() {
            return Err(CatalogError::Terminal(id, current.status));
        }

        let listing = self.listings.set_status(id, ListingStatus::Cancelled).await?;
        tracing::info!(listing_id = id, "Listing cancelled");
        Ok(listing)
    }

    /// Soft-delete; terminal, survives every later status write
    pub async fn delete_listing(&self, id: Id) -> CatalogResult<Listing> {
        let listing = match self.listings.set_status(id, ListingStatus::Deleted).await {
            Ok(l) => l,
            Err(RepoError::NotFound(_)) => return Err(CatalogError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(listing_id = id, "Listing deleted");
        Ok(listing)
    }

    pub async fn find_listing(&self, id: Id) -> CatalogResult<Listing> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn listings_for_store(&self, store_id: Id) -> CatalogResult<Vec<Listing>> {
        Ok(self.listings.find_by_store(store_id).await?)
    }

    /// Store-front view: purchasable listings only
    pub async fn active_listings(&self, store_id: Id) -> CatalogResult<Vec<Listing>> {
        let now = util::now_millis();
        Ok(self
            .listings
            .find_by_store(store_id)
            .await?
            .into_iter()
            .filter(|l| l.is_reservable(now))
            .collect())
    }

    fn validate_prices(original: Decimal, flash: Decimal) -> CatalogResult<()> {
        if flash <= Decimal::ZERO || flash >= original {
            return Err(CatalogError::InvalidFlashPrice { original, flash });
        }
        Ok(())
    }
}
