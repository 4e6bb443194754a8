//! Notification Model
//!
//! Persisted record of a dispatched notification; delivery itself is an
//! external collaborator. Swept by the daily retention task.

use crate::types::{Id, Timestamp};
use serde::{Deserialize, Serialize};

/// Notification kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewFlashSale,
    OrderConfirmed,
    OrderReady,
    OrderCancelled,
    Promotion,
    System,
}

/// Notification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Id,
    pub user_id: Id,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(user_id: Id, kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            is_read: false,
            created_at: crate::util::now_millis(),
        }
    }
}
