//! prtbot - GitLab merge request notifications for Telegram
//!
//! prtbot posts one Telegram message per GitLab merge request and keeps it
//! current: unresolved discussion threads, up-voters and the merge are
//! edited into the same message instead of being posted again.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): merge request and notification models, port traits
//! - **Service Layer** (`services`): reconciliation passes, strategy selection, scheduling
//! - **Adapters** (`adapters`): GitLab, Telegram, `SQLite` and in-memory port implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use prtbot::adapters::memory::InMemoryNotificationStore;
//! use prtbot::adapters::mock::{MockMergeRequestSource, MockNotificationChannel};
//! use prtbot::adapters::telegram::TelegramMarkdownRenderer;
//! use prtbot::domain::models::MergeRequestState;
//! use prtbot::services::{Reconciler, ReconcilerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reconciler = Reconciler::new(
//!         ReconcilerConfig::new(MergeRequestState::Opened, -1001, vec![7]),
//!         Arc::new(MockMergeRequestSource::new()),
//!         Arc::new(InMemoryNotificationStore::new()),
//!         Arc::new(MockNotificationChannel::new()),
//!         Arc::new(TelegramMarkdownRenderer::new()),
//!     );
//!     let report = reconciler.process().await?;
//!     println!("{} merge requests fetched", report.fetched);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, MergeRequest, MergeRequestId, MergeRequestState, MessageId, NotificationRecord,
    Snapshot,
};
pub use domain::ports::{
    MergeRequestSource, MessageRenderer, NotificationChannel, NotificationStore,
};
pub use domain::{ChannelError, DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{PassReport, PassScheduler, Reconciler, ReconcilerConfig, StrategySelector};
