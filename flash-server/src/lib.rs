//! Flash-sale inventory and order engine
//!
//! The engineering core of the platform: race-free stock reservation,
//! all-or-nothing multi-line order creation, the order state machine and
//! the time-driven expiry sweeps. HTTP, auth and durable persistence are
//! external collaborators; this crate programs against repository traits
//! and emits domain events for an external dispatcher.

pub mod catalog;
pub mod core;
pub mod db;
pub mod events;
pub mod lock;
pub mod orders;
pub mod scheduler;
pub mod stock;

pub use crate::core::config::Config;
pub use crate::core::state::ServerState;
