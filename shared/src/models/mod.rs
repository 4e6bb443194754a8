//! Domain models
//!
//! Serde entities shared between the engine and its collaborators.
//! Status enums carry their transition rules as pure functions; there is
//! no mutable lookup table anywhere.

pub mod listing;
pub mod notification;
pub mod order;
pub mod payment;
pub mod store;

pub use listing::{Listing, ListingCreate, ListingStatus, ListingUpdate};
pub use notification::{Notification, NotificationKind};
pub use order::{Order, OrderCreate, OrderLine, OrderLineInput, OrderStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use store::{Store, StoreStatus};
