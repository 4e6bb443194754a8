//! Lock backend seam
//!
//! The backend contract mirrors what a Redis-style store offers:
//! `SET NX EX`, `GET` and a guarded delete. Acquisition must be a single
//! atomic set-if-absent-with-expiry — a separate existence check would
//! reintroduce the race the lock exists to prevent.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Backend failure (network, store down, ...)
#[derive(Debug, Error)]
#[error("lock backend error: {0}")]
pub struct LockBackendError(pub String);

#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomically store `value` under `key` with expiry `ttl` if the key
    /// is absent (or its previous holder expired). Returns whether the
    /// set happened.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockBackendError>;

    /// Current value, if the key exists and has not expired
    async fn get(&self, key: &str) -> Result<Option<String>, LockBackendError>;

    /// Delete the key only if its current value equals `expected`.
    /// Returns whether a delete happened.
    async fn compare_and_delete(&self, key: &str, expected: &str)
    -> Result<bool, LockBackendError>;
}

// =============================================================================
// In-memory backend
// =============================================================================

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process backend with the same expiry semantics as the remote store
#[derive(Default)]
pub struct MemoryLockBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockBackendError> {
        use dashmap::mapref::entry::Entry as MapEntry;
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().expires_at > now {
                    return Ok(false);
                }
                // Previous holder's TTL elapsed; the slot is free
                occupied.insert(Entry {
                    value: value.to_string(),
                    expires_at: now + ttl,
                });
                Ok(true)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: value.to_string(),
                    expires_at: now + ttl,
                });
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LockBackendError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, LockBackendError> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, e| e.expires_at > now && e.value == expected);
        Ok(removed.is_some())
    }
}
