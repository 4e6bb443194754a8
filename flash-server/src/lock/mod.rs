//! Distributed Lock Service
//!
//! Short-TTL, ownership-checked mutual exclusion usable across process
//! instances. Advisory only: stock correctness never depends on these
//! locks — the reservation commit is race-free on its own. Used for
//! coarser critical sections such as duplicate order submission.

mod backend;
mod service;

pub use backend::{LockBackend, LockBackendError, MemoryLockBackend};
pub use service::LockService;
