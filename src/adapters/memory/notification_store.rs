//! Map-backed notification store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MergeRequestId, NotificationRecord};
use crate::domain::ports::NotificationStore;

/// Notification store that lives as long as the process.
#[derive(Clone, Default)]
pub struct InMemoryNotificationStore {
    records: Arc<RwLock<HashMap<MergeRequestId, NotificationRecord>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn get(&self, id: MergeRequestId) -> DomainResult<Option<NotificationRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn put(&self, record: &NotificationRecord) -> DomainResult<()> {
        self.records
            .write()
            .await
            .insert(record.merge_request, record.clone());
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<NotificationRecord>> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn remove(&self, id: MergeRequestId) -> DomainResult<bool> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MergeRequest, MergeRequestState, MessageId};
    use chrono::Utc;

    fn merge_request(iid: i64) -> MergeRequest {
        MergeRequest {
            id: MergeRequestId::new(3, iid),
            title: "Bump deps".to_string(),
            source_branch: "deps".to_string(),
            target_branch: "main".to_string(),
            web_url: "https://gitlab.example.com/app/-/merge_requests/1".to_string(),
            author_name: "Sam".to_string(),
            created_at: Utc::now(),
            state: MergeRequestState::Opened,
            unresolved_threads: Default::default(),
            up_voters: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = InMemoryNotificationStore::new();
        let mr = merge_request(1);
        let record = NotificationRecord::posted(&mr, -1, MessageId(10));
        store.put(&record).await.unwrap();

        let mut merged = mr.clone();
        merged.state = MergeRequestState::Merged;
        store.put(&record.observed(&merged)).await.unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store.get(mr.id).await.unwrap().unwrap();
        assert_eq!(stored.last_seen.state, MergeRequestState::Merged);
        assert_eq!(stored.message_id, MessageId(10));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryNotificationStore::new();
        assert!(store.get(MergeRequestId::new(3, 9)).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryNotificationStore::new();
        let mr = merge_request(4);
        store
            .put(&NotificationRecord::posted(&mr, -1, MessageId(3)))
            .await
            .unwrap();

        assert!(store.remove(mr.id).await.unwrap());
        assert!(!store.remove(mr.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
