//! Port for reading merge requests from the hosting service.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MergeRequest, MergeRequestFilter};

#[async_trait]
pub trait MergeRequestSource: Send + Sync {
    /// Fetch every merge request of a project matching the filter.
    ///
    /// Threads and up-voters must be populated. Any failure is reported as
    /// [`DomainError::SourceUnavailable`](crate::domain::errors::DomainError::SourceUnavailable).
    async fn fetch_by_state(
        &self,
        project_id: i64,
        filter: MergeRequestFilter,
    ) -> DomainResult<Vec<MergeRequest>>;
}
