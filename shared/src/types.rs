//! Common types for the shared crate

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Resource identifier (snowflake-style i64)
pub type Id = i64;
