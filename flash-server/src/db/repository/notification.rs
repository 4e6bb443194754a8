//! Notification Repository
//!
//! Stores dispatched notification records; the retention sweep deletes
//! old rows daily.

use super::RepoResult;
use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::Notification;
use shared::types::{Id, Timestamp};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> RepoResult<Notification>;

    async fn find_by_user(&self, user_id: Id) -> RepoResult<Vec<Notification>>;

    /// Delete records created before `cutoff`; returns the delete count
    async fn delete_older_than(&self, cutoff: Timestamp) -> RepoResult<usize>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
pub struct MemoryNotificationRepository {
    rows: DashMap<Id, Notification>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> RepoResult<Notification> {
        self.rows.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_user(&self, user_id: Id) -> RepoResult<Vec<Notification>> {
        let mut found: Vec<Notification> = self
            .rows
            .iter()
            .map(|r| r.value().clone())
            .filter(|n| n.user_id == user_id)
            .collect();
        found.sort_by_key(|n| n.created_at);
        Ok(found)
    }

    async fn delete_older_than(&self, cutoff: Timestamp) -> RepoResult<usize> {
        let before = self.rows.len();
        self.rows.retain(|_, n| n.created_at >= cutoff);
        Ok(before - self.rows.len())
    }
}
