//! In-memory adapters.

pub mod notification_store;

pub use notification_store::InMemoryNotificationStore;
