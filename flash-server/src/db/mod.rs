//! Data access layer
//!
//! Persistence proper (schema, migration, a durable engine) is an external
//! collaborator. This layer defines the repository traits the engine
//! programs against, plus in-memory implementations that provide the same
//! transactional guarantees: per-row exclusive sections for the two
//! conditional stock primitives and unique-index semantics for order
//! numbers.

pub mod repository;

pub use repository::{
    ListingRepository, MemoryListingRepository, MemoryNotificationRepository,
    MemoryOrderRepository, MemoryStoreRepository, NotificationRepository, OrderRepository,
    PaymentCas, RepoError, RepoResult, StatusCas, StoreRepository,
};
