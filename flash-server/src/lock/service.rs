//! Lock service
//!
//! Ownership-checked acquire/release over a [`LockBackend`]. Backend
//! failure degrades to "not acquired" — callers must never proceed under
//! an exclusivity assumption when the backend is down.

use super::backend::LockBackend;
use std::sync::Arc;
use std::time::Duration;

const LOCK_PREFIX: &str = "lock:";

/// Default TTL for locks acquired without an explicit one
const DEFAULT_TTL: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct LockService {
    backend: Arc<dyn LockBackend>,
    default_ttl: Duration,
}

impl LockService {
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self {
            backend,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(backend: Arc<dyn LockBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    /// Generate a fresh owner token for a lock attempt
    pub fn owner_token() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn prefixed(key: &str) -> String {
        format!("{}{}", LOCK_PREFIX, key)
    }

    /// Try to acquire a lock; returns whether the caller now holds it.
    ///
    /// There is no manual force-unlock path: a crashed holder's lock
    /// self-expires after `ttl`.
    pub async fn try_acquire(&self, key: &str, owner: &str, ttl: Duration) -> bool {
        match self
            .backend
            .set_if_absent(&Self::prefixed(key), owner, ttl)
            .await
        {
            Ok(true) => {
                tracing::debug!(key, "Lock acquired");
                true
            }
            Ok(false) => {
                tracing::debug!(key, "Failed to acquire lock");
                false
            }
            Err(e) => {
                // Fail-closed: a down backend means no exclusivity
                tracing::error!(key, error = %e, "Error acquiring lock");
                false
            }
        }
    }

    /// Try to acquire with the service's default TTL
    pub async fn try_acquire_default(&self, key: &str, owner: &str) -> bool {
        self.try_acquire(key, owner, self.default_ttl).await
    }

    /// Release a lock if (and only if) `owner` still holds it.
    ///
    /// A non-matching or already-expired lock is a logged no-op — never
    /// deletes another owner's lock.
    pub async fn release(&self, key: &str, owner: &str) {
        match self
            .backend
            .compare_and_delete(&Self::prefixed(key), owner)
            .await
        {
            Ok(true) => {
                tracing::debug!(key, "Lock released");
            }
            Ok(false) => {
                tracing::warn!(key, "Attempted to release lock not owned by this token");
            }
            Err(e) => {
                tracing::error!(key, error = %e, "Error releasing lock");
            }
        }
    }

    /// Whether the key is currently held by anyone
    pub async fn is_locked(&self, key: &str) -> bool {
        match self.backend.get(&Self::prefixed(key)).await {
            Ok(v) => v.is_some(),
            Err(e) => {
                tracing::error!(key, error = %e, "Error checking lock");
                false
            }
        }
    }
}
