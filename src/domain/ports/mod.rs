//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - MergeRequestSource: read-only merge request data from the hosting service
//! - NotificationStore: persistence of notification records
//! - NotificationChannel: posting and editing messages on the messaging platform
//! - MessageRenderer: turning merge requests into message text
//!
//! These traits define the contracts that allow the reconciler to be independent
//! of specific infrastructure implementations.

pub mod merge_request_source;
pub mod message_renderer;
pub mod notification_channel;
pub mod notification_store;

pub use merge_request_source::MergeRequestSource;
pub use message_renderer::MessageRenderer;
pub use notification_channel::NotificationChannel;
pub use notification_store::NotificationStore;
