//! Order Engine
//!
//! Multi-line order creation with all-or-nothing stock reservation, the
//! order state machine, cancellation and payment processing.

pub mod manager;

#[cfg(test)]
mod tests;

pub use manager::{OrderError, OrderManager, OrderResult};
