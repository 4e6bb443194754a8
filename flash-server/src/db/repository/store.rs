//! Store Repository

use super::{RepoError, RepoResult};
use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::{Store, StoreStatus};
use shared::types::Id;

#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn insert(&self, store: Store) -> RepoResult<Store>;

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Store>>;

    async fn set_status(&self, id: Id, status: StoreStatus) -> RepoResult<Store>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
pub struct MemoryStoreRepository {
    rows: DashMap<Id, Store>,
}

impl MemoryStoreRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreRepository for MemoryStoreRepository {
    async fn insert(&self, store: Store) -> RepoResult<Store> {
        use dashmap::mapref::entry::Entry;
        match self.rows.entry(store.id) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!("store {}", store.id))),
            Entry::Vacant(e) => {
                e.insert(store.clone());
                Ok(store)
            }
        }
    }

    async fn find_by_id(&self, id: Id) -> RepoResult<Option<Store>> {
        Ok(self.rows.get(&id).map(|s| s.clone()))
    }

    async fn set_status(&self, id: Id, status: StoreStatus) -> RepoResult<Store> {
        let mut entry = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("store {}", id)))?;
        entry.status = status;
        Ok(entry.clone())
    }
}
