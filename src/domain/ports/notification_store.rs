//! Repository port for notification record persistence.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MergeRequestId, NotificationRecord};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Get the record of a merge request, if one was ever written.
    async fn get(&self, id: MergeRequestId) -> DomainResult<Option<NotificationRecord>>;

    /// Insert or replace the record of `record.merge_request`.
    ///
    /// Implementations keep at most one record per merge request and apply
    /// the write atomically.
    async fn put(&self, record: &NotificationRecord) -> DomainResult<()>;

    /// List all records, most recently updated first.
    async fn list(&self) -> DomainResult<Vec<NotificationRecord>>;

    /// Forget the record of a merge request. Returns whether one existed.
    ///
    /// Passes never call this; it backs manual cleanup only.
    async fn remove(&self, id: MergeRequestId) -> DomainResult<bool>;
}
