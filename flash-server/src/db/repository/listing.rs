//! Listing Repository
//!
//! Holds the two conditional stock primitives `reserve_if_available` and
//! `restore`. Every stock mutation goes through a per-row exclusive
//! section: the availability check and the decrement commit as one step,
//! so no interleaving can oversell or drive `available_quantity`
//! negative.

use super::{RepoError, RepoResult};
use crate::stock::StockError;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared::models::{Listing, ListingStatus, ListingUpdate};
use shared::types::{Id, Timestamp};
use shared::util;
use std::sync::Arc;
use std::time::Duration;

/// Listing store seam
///
/// Everything except the two stock primitives treats the store as a
/// transactional key-value map keyed by listing id.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert(&self, listing: Listing) -> RepoResult<Listing>;

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Listing>>;

    async fn find_by_store(&self, store_id: Id) -> RepoResult<Vec<Listing>>;

    /// Optimistic update of non-stock fields; fails with
    /// [`RepoError::StaleRevision`] when the row moved underneath the
    /// caller. Never touches quantities.
    async fn update_with_revision(
        &self,
        id: Id,
        update: ListingUpdate,
        expected_revision: u64,
    ) -> RepoResult<Listing>;

    /// Raw status write (cancel / soft-delete paths). `Deleted` is
    /// terminal: once set, further writes are ignored.
    async fn set_status(&self, id: Id, status: ListingStatus) -> RepoResult<Listing>;

    /// Ids of listings whose sale window elapsed but are not yet flagged
    async fn find_expiry_candidates(&self, now: Timestamp) -> RepoResult<Vec<Id>>;

    /// Idempotent expiry write; returns true when the row actually changed
    async fn mark_expired(&self, id: Id, now: Timestamp) -> RepoResult<bool>;

    /// Atomically decrement stock if the listing is purchasable and has
    /// at least `qty` units. Transitions to SoldOut in the same step when
    /// the remainder hits zero. Bounded wait on the row lock; contention
    /// beyond the bound surfaces as the retryable [`StockError::Busy`].
    async fn reserve_if_available(
        &self,
        id: Id,
        qty: u32,
        now: Timestamp,
    ) -> Result<Listing, StockError>;

    /// Increment stock, clamped at `total_quantity`. SoldOut flips back
    /// to Available only while still inside the sale window. Restores
    /// take the row lock unconditionally — rollback paths must not fail
    /// on contention.
    async fn restore(&self, id: Id, qty: u32, now: Timestamp) -> Result<Listing, StockError>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

pub struct MemoryListingRepository {
    rows: DashMap<Id, Arc<Mutex<Listing>>>,
    /// Bounded wait for the reserve path
    reserve_wait: Duration,
}

impl MemoryListingRepository {
    pub fn new(reserve_wait: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            reserve_wait,
        }
    }

    fn row(&self, id: Id) -> Option<Arc<Mutex<Listing>>> {
        // Clone the Arc out so the shard lock is not held while the row
        // lock is taken.
        self.rows.get(&id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl ListingRepository for MemoryListingRepository {
    async fn insert(&self, listing: Listing) -> RepoResult<Listing> {
        use dashmap::mapref::entry::Entry;
        match self.rows.entry(listing.id) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!("listing {}", listing.id))),
            Entry::Vacant(e) => {
                e.insert(Arc::new(Mutex::new(listing.clone())));
                Ok(listing)
            }
        }
    }

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Listing>> {
        Ok(self.row(id).map(|row| row.lock().clone()))
    }

    async fn find_by_store(&self, store_id: Id) -> RepoResult<Vec<Listing>> {
        let mut found: Vec<Listing> = self
            .rows
            .iter()
            .map(|r| r.value().lock().clone())
            .filter(|l| l.store_id == store_id)
            .collect();
        found.sort_by_key(|l| l.created_at);
        Ok(found)
    }

    async fn update_with_revision(
        &self,
        id: Id,
        update: ListingUpdate,
        expected_revision: u64,
    ) -> RepoResult<Listing> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("listing {}", id)))?;
        let mut guard = row.lock();

        if guard.revision != expected_revision {
            return Err(RepoError::StaleRevision {
                expected: expected_revision,
                actual: guard.revision,
            });
        }

        if let Some(name) = update.name {
            guard.name = name;
        }
        if let Some(description) = update.description {
            guard.description = Some(description);
        }
        if let Some(image_url) = update.image_url {
            guard.image_url = Some(image_url);
        }
        if let Some(original_price) = update.original_price {
            guard.original_price = original_price;
        }
        if let Some(flash_price) = update.flash_price {
            guard.flash_price = flash_price;
        }
        guard.discount_percent = util::discount_percent(guard.original_price, guard.flash_price);
        guard.revision += 1;
        guard.updated_at = util::now_millis();

        Ok(guard.clone())
    }

    async fn set_status(&self, id: Id, status: ListingStatus) -> RepoResult<Listing> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("listing {}", id)))?;
        let mut guard = row.lock();

        // Soft delete is terminal and overrides everything else
        if guard.status != ListingStatus::Deleted {
            guard.status = status;
            guard.updated_at = util::now_millis();
        }
        Ok(guard.clone())
    }

    async fn find_expiry_candidates(&self, now: Timestamp) -> RepoResult<Vec<Id>> {
        Ok(self
            .rows
            .iter()
            .filter_map(|r| {
                let l = r.value().lock();
                (!l.is_expired && l.sale_end < now && l.status != ListingStatus::Deleted)
                    .then_some(l.id)
            })
            .collect())
    }

    async fn mark_expired(&self, id: Id, now: Timestamp) -> RepoResult<bool> {
        let row = self
            .row(id)
            .ok_or_else(|| RepoError::NotFound(format!("listing {}", id)))?;
        let mut guard = row.lock();

        if guard.is_expired || guard.status == ListingStatus::Deleted {
            return Ok(false);
        }
        if guard.sale_end >= now {
            // Candidate list was computed from an older clock reading
            return Ok(false);
        }
        guard.is_expired = true;
        guard.status = ListingStatus::Expired;
        guard.updated_at = now;
        Ok(true)
    }

    async fn reserve_if_available(
        &self,
        id: Id,
        qty: u32,
        now: Timestamp,
    ) -> Result<Listing, StockError> {
        let row = self.row(id).ok_or(StockError::NotFound(id))?;
        let mut guard = row.try_lock_for(self.reserve_wait).ok_or(StockError::Busy(id))?;

        // SoldOut inside a live window is a quantity problem, not an
        // availability one: callers racing for the last units see how
        // much was left, same as a partial shortfall.
        let sellable = matches!(
            guard.status,
            ListingStatus::Available | ListingStatus::SoldOut
        );
        if !sellable || guard.is_expired || !guard.in_sale_window(now) {
            return Err(StockError::NotAvailable(id));
        }
        if guard.available_quantity < qty {
            return Err(StockError::Insufficient {
                listing_id: id,
                available: guard.available_quantity,
                requested: qty,
            });
        }

        guard.available_quantity -= qty;
        if guard.available_quantity == 0 {
            guard.status = ListingStatus::SoldOut;
        }
        guard.updated_at = now;
        Ok(guard.clone())
    }

    async fn restore(&self, id: Id, qty: u32, now: Timestamp) -> Result<Listing, StockError> {
        let row = self.row(id).ok_or(StockError::NotFound(id))?;
        let mut guard = row.lock();

        guard.available_quantity = guard
            .available_quantity
            .saturating_add(qty)
            .min(guard.total_quantity);
        if guard.status == ListingStatus::SoldOut
            && guard.available_quantity > 0
            && !guard.is_expired
            && guard.in_sale_window(now)
        {
            guard.status = ListingStatus::Available;
        }
        guard.updated_at = now;
        Ok(guard.clone())
    }
}
