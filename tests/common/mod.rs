//! Common test utilities for integration tests
//!
//! Provides merge request fixtures and a harness wiring reconcilers to the
//! in-process source and channel over either store implementation.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone, Utc};

use prtbot::adapters::memory::InMemoryNotificationStore;
use prtbot::adapters::mock::{MockMergeRequestSource, MockNotificationChannel};
use prtbot::adapters::sqlite::{create_migrated_test_pool, SqliteNotificationStore};
use prtbot::adapters::telegram::TelegramMarkdownRenderer;
use prtbot::domain::models::{MergeRequest, MergeRequestId, MergeRequestState};
use prtbot::domain::ports::NotificationStore;
use prtbot::services::{Reconciler, ReconcilerConfig, StrategySelector};

pub const CHAT_ID: i64 = -1_001_234;
pub const PROJECT_ID: i64 = 7;

/// Merge request with no threads and no up-voters.
pub fn merge_request(iid: i64, state: MergeRequestState) -> MergeRequest {
    MergeRequest {
        id: MergeRequestId::new(PROJECT_ID, iid),
        title: format!("Change number {iid}"),
        source_branch: format!("feature/{iid}"),
        target_branch: "main".to_string(),
        web_url: format!("https://gitlab.example.com/group/app/-/merge_requests/{iid}"),
        author_name: "Jane Doe".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap(),
        state,
        unresolved_threads: Default::default(),
        up_voters: Default::default(),
    }
}

pub fn with_thread(mut mr: MergeRequest, id: &str, description: &str) -> MergeRequest {
    mr.unresolved_threads
        .insert(id.to_string(), description.to_string());
    mr
}

pub fn with_up_voters(mut mr: MergeRequest, names: &[&str]) -> MergeRequest {
    mr.up_voters = names.iter().map(|n| (*n).to_string()).collect();
    mr
}

/// Renderer pinned to UTC+3 so dates are stable across hosts.
pub fn renderer() -> TelegramMarkdownRenderer {
    TelegramMarkdownRenderer::with_offset(FixedOffset::east_opt(3 * 3600).unwrap())
}

#[derive(Debug, Clone, Copy)]
pub enum StoreKind {
    Memory,
    Sqlite,
}

pub const STORE_KINDS: [StoreKind; 2] = [StoreKind::Memory, StoreKind::Sqlite];

pub async fn store(kind: StoreKind) -> Arc<dyn NotificationStore> {
    match kind {
        StoreKind::Memory => Arc::new(InMemoryNotificationStore::new()),
        StoreKind::Sqlite => {
            let pool = create_migrated_test_pool()
                .await
                .expect("Failed to create test database");
            Arc::new(SqliteNotificationStore::new(pool))
        }
    }
}

/// Reconcilers for both tracked states sharing one source, store and channel.
pub struct Harness {
    pub source: Arc<MockMergeRequestSource>,
    pub channel: Arc<MockNotificationChannel>,
    pub store: Arc<dyn NotificationStore>,
    pub selector: StrategySelector,
}

impl Harness {
    pub async fn new(kind: StoreKind) -> Self {
        Self::with_projects(kind, vec![PROJECT_ID]).await
    }

    pub async fn with_projects(kind: StoreKind, project_ids: Vec<i64>) -> Self {
        let source = Arc::new(MockMergeRequestSource::new());
        let channel = Arc::new(MockNotificationChannel::new());
        let store = store(kind).await;

        let reconciler = |state| {
            Arc::new(Reconciler::new(
                ReconcilerConfig::new(state, CHAT_ID, project_ids.clone()),
                source.clone(),
                store.clone(),
                channel.clone(),
                Arc::new(renderer()),
            ))
        };
        let selector = StrategySelector::new(
            reconciler(MergeRequestState::Opened),
            reconciler(MergeRequestState::Merged),
        )
        .expect("Reconcilers match their slots");

        Self {
            source,
            channel,
            store,
            selector,
        }
    }

    pub async fn pass(&self, state: MergeRequestState) -> prtbot::services::PassReport {
        self.selector
            .process(state)
            .await
            .expect("Pass should succeed")
    }
}
