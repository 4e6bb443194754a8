//! Store Model

use crate::types::{Id, Timestamp};
use serde::{Deserialize, Serialize};

/// Store status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Active,
    Inactive,
    Suspended,
    #[default]
    PendingApproval,
}

impl StoreStatus {
    /// Whether the store may accept new orders
    pub fn accepts_orders(&self) -> bool {
        matches!(self, StoreStatus::Active)
    }
}

/// Store entity
///
/// Listings hold a non-owning `store_id` back-reference; the reverse
/// lookup (store -> listings) lives in the listing repository index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: Id,
    pub name: String,
    pub address: Option<String>,
    pub status: StoreStatus,
    pub created_at: Timestamp,
}

impl Store {
    pub fn new(id: Id, name: impl Into<String>, status: StoreStatus) -> Self {
        Self {
            id,
            name: name.into(),
            address: None,
            status,
            created_at: crate::util::now_millis(),
        }
    }
}
