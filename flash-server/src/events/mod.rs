//! Domain event bus
//!
//! The core emits one event per state transition onto a broadcast
//! channel; an external dispatcher fans them out (push, queue, geo
//! notification). Delivery is not guaranteed here — subscribers that lag
//! simply miss events, which the collaborator protocol tolerates.

use serde::{Deserialize, Serialize};
use shared::types::Id;
use std::fmt;
use tokio::sync::broadcast;

/// 事件广播通道容量
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Domain events emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    OrderCreated { order_id: Id, store_id: Id, customer_id: Id },
    OrderConfirmed { order_id: Id },
    OrderPreparing { order_id: Id },
    OrderReady { order_id: Id, customer_id: Id },
    OrderCompleted { order_id: Id },
    OrderCancelled { order_id: Id, store_id: Id },
    OrderExpired { order_id: Id },
    PaymentProcessed { order_id: Id, success: bool },
    ListingCreated { listing_id: Id, store_id: Id },
    ListingSoldOut { listing_id: Id },
    ListingExpired { listing_id: Id },
}

impl DomainEvent {
    /// Stable event name for logs and dispatch routing
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "order_created",
            DomainEvent::OrderConfirmed { .. } => "order_confirmed",
            DomainEvent::OrderPreparing { .. } => "order_preparing",
            DomainEvent::OrderReady { .. } => "order_ready",
            DomainEvent::OrderCompleted { .. } => "order_completed",
            DomainEvent::OrderCancelled { .. } => "order_cancelled",
            DomainEvent::OrderExpired { .. } => "order_expired",
            DomainEvent::PaymentProcessed { .. } => "payment_processed",
            DomainEvent::ListingCreated { .. } => "listing_created",
            DomainEvent::ListingSoldOut { .. } => "listing_sold_out",
            DomainEvent::ListingExpired { .. } => "listing_expired",
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Broadcast bus for domain events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; no receivers is not an error
    pub fn emit(&self, event: DomainEvent) {
        tracing::debug!(event = ?event, "Domain event");
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
