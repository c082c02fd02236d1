//! SQLite implementation of the NotificationStore.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{parse_datetime, parse_json_or_default};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    MergeRequestId, MergeRequestState, MessageId, NotificationRecord, Snapshot,
};
use crate::domain::ports::NotificationStore;

#[derive(Clone)]
pub struct SqliteNotificationStore {
    pool: SqlitePool,
}

impl SqliteNotificationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    project_id: i64,
    iid: i64,
    chat_id: i64,
    message_id: i64,
    last_state: String,
    last_threads: Option<String>,
    last_up_voters: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_record(row: NotificationRow) -> DomainResult<NotificationRecord> {
    let state = MergeRequestState::from_str(&row.last_state).ok_or_else(|| {
        DomainError::Serialization(format!("Unknown merge request state: {}", row.last_state))
    })?;
    let threads: BTreeSet<String> = parse_json_or_default(row.last_threads)?;
    let up_voters: BTreeSet<String> = parse_json_or_default(row.last_up_voters)?;

    Ok(NotificationRecord {
        merge_request: MergeRequestId::new(row.project_id, row.iid),
        chat_id: row.chat_id,
        message_id: MessageId(row.message_id),
        last_seen: Snapshot {
            threads,
            up_voters,
            state,
        },
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn get(&self, id: MergeRequestId) -> DomainResult<Option<NotificationRecord>> {
        let row: Option<NotificationRow> =
            sqlx::query_as("SELECT * FROM notifications WHERE project_id = ? AND iid = ?")
                .bind(id.project_id)
                .bind(id.iid)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_record).transpose()
    }

    async fn put(&self, record: &NotificationRecord) -> DomainResult<()> {
        let threads = serde_json::to_string(&record.last_seen.threads)?;
        let up_voters = serde_json::to_string(&record.last_seen.up_voters)?;

        sqlx::query(
            r#"INSERT INTO notifications
               (project_id, iid, chat_id, message_id, last_state, last_threads, last_up_voters,
                created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (project_id, iid) DO UPDATE SET
                 chat_id = excluded.chat_id,
                 message_id = excluded.message_id,
                 last_state = excluded.last_state,
                 last_threads = excluded.last_threads,
                 last_up_voters = excluded.last_up_voters,
                 updated_at = excluded.updated_at"#,
        )
        .bind(record.merge_request.project_id)
        .bind(record.merge_request.iid)
        .bind(record.chat_id)
        .bind(record.message_id.0)
        .bind(record.last_seen.state.as_str())
        .bind(&threads)
        .bind(&up_voters)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<NotificationRecord>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT * FROM notifications ORDER BY updated_at DESC, project_id, iid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn remove(&self, id: MergeRequestId) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE project_id = ? AND iid = ?")
            .bind(id.project_id)
            .bind(id.iid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::MergeRequest;
    use chrono::Utc;

    fn merge_request(iid: i64) -> MergeRequest {
        MergeRequest {
            id: MergeRequestId::new(5, iid),
            title: "Cache lookups".to_string(),
            source_branch: "perf/cache".to_string(),
            target_branch: "main".to_string(),
            web_url: format!("https://gitlab.example.com/app/-/merge_requests/{iid}"),
            author_name: "Kim".to_string(),
            created_at: Utc::now(),
            state: MergeRequestState::Opened,
            unresolved_threads: [("t1".to_string(), "naming".to_string())].into(),
            up_voters: ["alice".to_string()].into(),
        }
    }

    async fn setup_store() -> SqliteNotificationStore {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteNotificationStore::new(pool)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = setup_store().await;
        let mr = merge_request(11);
        let record = NotificationRecord::posted(&mr, -1001, MessageId(77));

        store.put(&record).await.unwrap();
        let stored = store.get(mr.id).await.unwrap().unwrap();

        assert_eq!(stored.merge_request, mr.id);
        assert_eq!(stored.chat_id, -1001);
        assert_eq!(stored.message_id, MessageId(77));
        assert_eq!(stored.last_seen, record.last_seen);
        assert_eq!(stored.created_at.timestamp(), record.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = setup_store().await;
        assert!(store.get(MergeRequestId::new(5, 404)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_upserts_single_row() {
        let store = setup_store().await;
        let mr = merge_request(12);
        let record = NotificationRecord::posted(&mr, -1001, MessageId(1));
        store.put(&record).await.unwrap();

        let mut merged = mr.clone();
        merged.state = MergeRequestState::Merged;
        merged.unresolved_threads.clear();
        store.put(&record.observed(&merged)).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].last_seen.state, MergeRequestState::Merged);
        assert!(all[0].last_seen.threads.is_empty());
        assert_eq!(all[0].message_id, MessageId(1));
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let store = setup_store().await;
        let mut older = NotificationRecord::posted(&merge_request(1), -1, MessageId(1));
        older.updated_at = Utc::now() - chrono::Duration::hours(1);
        let newer = NotificationRecord::posted(&merge_request(2), -1, MessageId(2));

        store.put(&older).await.unwrap();
        store.put(&newer).await.unwrap();

        let ids: Vec<i64> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|r| r.merge_request.iid)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_remove_deletes_row() {
        let store = setup_store().await;
        let mr = merge_request(13);
        store
            .put(&NotificationRecord::posted(&mr, -1, MessageId(5)))
            .await
            .unwrap();

        assert!(store.remove(mr.id).await.unwrap());
        assert!(store.get(mr.id).await.unwrap().is_none());
        assert!(!store.remove(mr.id).await.unwrap());
    }
}
