//! Shared types for the flash-sale platform
//!
//! Domain models, error types and small utilities used by the engine
//! crates. No I/O lives here.

pub mod error;
pub mod models;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
