//! End-to-end behaviour of reconciliation passes over the in-process
//! source and channel, against both store implementations.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{
    merge_request, with_thread, with_up_voters, Harness, CHAT_ID, PROJECT_ID, STORE_KINDS,
};
use prtbot::adapters::mock::{ChannelCall, MockMergeRequestSource, MockNotificationChannel};
use prtbot::domain::models::{
    MergeRequestId, MergeRequestState, MessageId, NotificationRecord,
};
use prtbot::domain::ports::NotificationStore;
use prtbot::domain::{ChannelError, DomainError, DomainResult};
use prtbot::services::{Reconciler, ReconcilerConfig};

const BASE_42: &str = "[Pull request !42](https://gitlab.example.com/group/app/-/merge_requests/42)\n\
`feature/42` -> `main`\n\
Change number 42\n\
Opened 01 March 13:15 by Jane Doe";

#[tokio::test]
async fn test_new_merge_request_is_announced_once() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(42, MergeRequestState::Opened))
            .await;

        let report = h.pass(MergeRequestState::Opened).await;
        assert_eq!((report.fetched, report.created), (1, 1), "{kind:?}");

        let calls = h.channel.calls().await;
        assert_eq!(
            calls,
            vec![ChannelCall::Create {
                chat_id: CHAT_ID,
                text: BASE_42.to_string(),
            }],
            "{kind:?}"
        );

        let record = h
            .store
            .get(MergeRequestId::new(PROJECT_ID, 42))
            .await
            .unwrap()
            .expect("record written after create");
        assert_eq!(record.chat_id, CHAT_ID);
        assert_eq!(record.message_id, MessageId(1));
        assert_eq!(record.last_seen.state, MergeRequestState::Opened);
    }
}

#[tokio::test]
async fn test_pass_without_changes_is_idempotent() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        let mr = with_up_voters(
            with_thread(merge_request(42, MergeRequestState::Opened), "t1", "fix tests"),
            &["alice"],
        );
        h.source.upsert(mr).await;

        h.pass(MergeRequestState::Opened).await;
        let calls_after_first = h.channel.call_count().await;
        let record_after_first = h.store.list().await.unwrap();

        let second = h.pass(MergeRequestState::Opened).await;
        let third = h.pass(MergeRequestState::Opened).await;

        assert_eq!(second.writes(), 0, "{kind:?}");
        assert_eq!(third.unchanged, 1, "{kind:?}");
        assert_eq!(h.channel.call_count().await, calls_after_first, "{kind:?}");
        assert_eq!(h.store.list().await.unwrap(), record_after_first, "{kind:?}");
    }
}

#[tokio::test]
async fn test_announcement_of_active_merge_request_shows_activity() {
    let h = Harness::new(common::StoreKind::Memory).await;
    let mr = with_up_voters(
        with_thread(merge_request(42, MergeRequestState::Opened), "t1", "fix tests"),
        &["bob", "alice"],
    );
    h.source.upsert(mr).await;

    h.pass(MergeRequestState::Opened).await;

    let text = h.channel.message(CHAT_ID, MessageId(1)).await.unwrap();
    assert_eq!(
        text,
        format!(
            "{BASE_42}\n\n*Unresolved threads*\n\t\tt1 - fix tests\n\n\u{1F44D} - 2 by alice, bob"
        )
    );
}

#[tokio::test]
async fn test_new_thread_edits_the_same_message() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(42, MergeRequestState::Opened))
            .await;
        h.pass(MergeRequestState::Opened).await;

        h.source
            .upsert(with_thread(
                merge_request(42, MergeRequestState::Opened),
                "t1",
                "fix tests",
            ))
            .await;
        let report = h.pass(MergeRequestState::Opened).await;

        assert_eq!(report.edited, 1, "{kind:?}");
        assert_eq!(h.channel.message_count().await, 1, "{kind:?}");
        assert_eq!(
            h.channel.message(CHAT_ID, MessageId(1)).await.unwrap(),
            format!("{BASE_42}\n\n*Unresolved threads*\n\t\tt1 - fix tests"),
            "{kind:?}"
        );

        let record = h
            .store
            .get(MergeRequestId::new(PROJECT_ID, 42))
            .await
            .unwrap()
            .unwrap();
        assert!(record.last_seen.threads.contains("t1"), "{kind:?}");
        assert_eq!(h.store.list().await.unwrap().len(), 1, "{kind:?}");
    }
}

#[tokio::test]
async fn test_known_threads_are_not_repeated() {
    let h = Harness::new(common::StoreKind::Sqlite).await;
    let with_t1 = with_thread(merge_request(42, MergeRequestState::Opened), "t1", "fix tests");
    h.source.upsert(with_t1.clone()).await;
    h.pass(MergeRequestState::Opened).await;

    h.source
        .upsert(with_thread(with_t1, "t2", "rename variable"))
        .await;
    h.pass(MergeRequestState::Opened).await;

    let text = h.channel.message(CHAT_ID, MessageId(1)).await.unwrap();
    assert!(text.ends_with("*Unresolved threads*\n\t\tt2 - rename variable"));
    assert!(!text.contains("fix tests"));
}

#[tokio::test]
async fn test_up_voters_are_shown_cumulatively() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(with_up_voters(
                merge_request(42, MergeRequestState::Opened),
                &["alice"],
            ))
            .await;
        h.pass(MergeRequestState::Opened).await;

        h.source
            .upsert(with_up_voters(
                merge_request(42, MergeRequestState::Opened),
                &["alice", "bob"],
            ))
            .await;
        let report = h.pass(MergeRequestState::Opened).await;

        assert_eq!(report.edited, 1, "{kind:?}");
        let text = h.channel.message(CHAT_ID, MessageId(1)).await.unwrap();
        assert!(text.ends_with("\u{1F44D} - 2 by alice, bob"), "{kind:?}: {text}");
    }
}

#[tokio::test]
async fn test_resolved_thread_refreshes_snapshot() {
    let h = Harness::new(common::StoreKind::Sqlite).await;
    h.source
        .upsert(with_thread(
            merge_request(42, MergeRequestState::Opened),
            "t1",
            "fix tests",
        ))
        .await;
    h.pass(MergeRequestState::Opened).await;

    h.source
        .upsert(merge_request(42, MergeRequestState::Opened))
        .await;
    let report = h.pass(MergeRequestState::Opened).await;
    assert_eq!(report.edited, 1);

    let record = h
        .store
        .get(MergeRequestId::new(PROJECT_ID, 42))
        .await
        .unwrap()
        .unwrap();
    assert!(record.last_seen.threads.is_empty());

    let again = h.pass(MergeRequestState::Opened).await;
    assert_eq!(again.unchanged, 1);
}

#[tokio::test]
async fn test_merge_edits_the_opened_announcement() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(42, MergeRequestState::Opened))
            .await;
        h.pass(MergeRequestState::Opened).await;

        h.source
            .upsert(merge_request(42, MergeRequestState::Merged))
            .await;

        // The opened pass no longer sees it
        let opened = h.pass(MergeRequestState::Opened).await;
        assert_eq!(opened.fetched, 0, "{kind:?}");

        let merged = h.pass(MergeRequestState::Merged).await;
        assert_eq!((merged.created, merged.edited), (0, 1), "{kind:?}");
        assert_eq!(
            h.channel.message(CHAT_ID, MessageId(1)).await.unwrap(),
            format!("{BASE_42}\nMerged"),
            "{kind:?}"
        );

        let record = h
            .store
            .get(MergeRequestId::new(PROJECT_ID, 42))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.message_id, MessageId(1), "{kind:?}");
        assert_eq!(record.last_seen.state, MergeRequestState::Merged, "{kind:?}");

        let repeat = h.pass(MergeRequestState::Merged).await;
        assert_eq!(repeat.unchanged, 1, "{kind:?}");
    }
}

#[tokio::test]
async fn test_merged_without_prior_announcement_is_created() {
    let h = Harness::new(common::StoreKind::Memory).await;
    h.source
        .upsert(merge_request(42, MergeRequestState::Merged))
        .await;

    let report = h.pass(MergeRequestState::Merged).await;

    assert_eq!(report.created, 1);
    assert_eq!(
        h.channel.message(CHAT_ID, MessageId(1)).await.unwrap(),
        format!("{BASE_42}\nMerged")
    );
}

#[tokio::test]
async fn test_source_failure_aborts_pass_without_side_effects() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(42, MergeRequestState::Opened))
            .await;
        h.source.fail_with("502 Bad Gateway").await;

        let err = h
            .selector
            .process(MergeRequestState::Opened)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::SourceUnavailable(_)), "{kind:?}");
        assert_eq!(h.channel.call_count().await, 0, "{kind:?}");
        assert!(h.store.list().await.unwrap().is_empty(), "{kind:?}");

        h.source.clear_failure().await;
        let report = h.pass(MergeRequestState::Opened).await;
        assert_eq!(report.created, 1, "{kind:?}");
    }
}

#[tokio::test]
async fn test_failure_in_any_project_aborts_before_writes() {
    let h = Harness::with_projects(common::StoreKind::Memory, vec![PROJECT_ID, 8]).await;
    h.source
        .upsert(merge_request(42, MergeRequestState::Opened))
        .await;
    h.source.fail_with("timeout").await;

    assert!(h.selector.process(MergeRequestState::Opened).await.is_err());
    assert_eq!(h.channel.call_count().await, 0);
}

#[tokio::test]
async fn test_create_failure_is_retried_next_pass() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(1, MergeRequestState::Opened))
            .await;
        h.source
            .upsert(merge_request(2, MergeRequestState::Opened))
            .await;
        h.channel
            .fail_matching("!2]", ChannelError::Transport("timeout".to_string()))
            .await;

        let first = h.pass(MergeRequestState::Opened).await;
        assert_eq!((first.created, first.failed), (1, 1), "{kind:?}");
        assert!(h
            .store
            .get(MergeRequestId::new(PROJECT_ID, 2))
            .await
            .unwrap()
            .is_none());

        h.channel.clear_failures().await;
        let second = h.pass(MergeRequestState::Opened).await;
        assert_eq!((second.created, second.unchanged), (1, 1), "{kind:?}");
        assert_eq!(h.channel.message_count().await, 2, "{kind:?}");
        assert_eq!(h.store.list().await.unwrap().len(), 2, "{kind:?}");
    }
}

#[tokio::test]
async fn test_edit_failure_keeps_snapshot_stale() {
    for kind in STORE_KINDS {
        let h = Harness::new(kind).await;
        h.source
            .upsert(merge_request(42, MergeRequestState::Opened))
            .await;
        h.pass(MergeRequestState::Opened).await;

        h.source
            .upsert(with_thread(
                merge_request(42, MergeRequestState::Opened),
                "t1",
                "fix tests",
            ))
            .await;
        h.channel
            .fail_matching(
                "fix tests",
                ChannelError::Rejected("Too Many Requests".to_string()),
            )
            .await;

        let failed = h.pass(MergeRequestState::Opened).await;
        assert_eq!(failed.failed, 1, "{kind:?}");
        let record = h
            .store
            .get(MergeRequestId::new(PROJECT_ID, 42))
            .await
            .unwrap()
            .unwrap();
        assert!(record.last_seen.threads.is_empty(), "{kind:?}");

        h.channel.clear_failures().await;
        let retried = h.pass(MergeRequestState::Opened).await;
        assert_eq!(retried.edited, 1, "{kind:?}");
        assert!(h
            .channel
            .message(CHAT_ID, MessageId(1))
            .await
            .unwrap()
            .contains("t1 - fix tests"));
    }
}

#[tokio::test]
async fn test_closed_state_is_rejected() {
    let h = Harness::new(common::StoreKind::Memory).await;

    let err = h
        .selector
        .process(MergeRequestState::Closed)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::UnsupportedState(MergeRequestState::Closed)
    ));
    assert_eq!(h.source.fetch_count(), 0);
}

#[tokio::test]
async fn test_every_configured_project_is_fetched() {
    let h = Harness::with_projects(common::StoreKind::Memory, vec![PROJECT_ID, 8, 9]).await;
    h.source
        .upsert(merge_request(42, MergeRequestState::Opened))
        .await;

    let report = h.pass(MergeRequestState::Opened).await;

    assert_eq!(h.source.fetch_count(), 3);
    assert_eq!(report.fetched, 1);
}

/// Store whose writes always fail, as with a full disk.
struct ReadOnlyStore;

#[async_trait]
impl NotificationStore for ReadOnlyStore {
    async fn get(&self, _id: MergeRequestId) -> DomainResult<Option<NotificationRecord>> {
        Ok(None)
    }

    async fn put(&self, _record: &NotificationRecord) -> DomainResult<()> {
        Err(DomainError::Store("disk full".to_string()))
    }

    async fn list(&self) -> DomainResult<Vec<NotificationRecord>> {
        Ok(Vec::new())
    }

    async fn remove(&self, _id: MergeRequestId) -> DomainResult<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_store_failure_aborts_pass() {
    let source = Arc::new(MockMergeRequestSource::new());
    let channel = Arc::new(MockNotificationChannel::new());
    source
        .upsert(merge_request(1, MergeRequestState::Opened))
        .await;
    source
        .upsert(merge_request(2, MergeRequestState::Opened))
        .await;

    let reconciler = Reconciler::new(
        ReconcilerConfig::new(MergeRequestState::Opened, CHAT_ID, vec![PROJECT_ID]),
        source.clone(),
        Arc::new(ReadOnlyStore),
        channel.clone(),
        Arc::new(common::renderer()),
    );

    let err = reconciler.process().await.unwrap_err();
    assert!(matches!(err, DomainError::Store(ref msg) if msg == "disk full"));

    // The first merge request was posted before its record failed to save;
    // the second never reached the channel
    assert_eq!(channel.call_count().await, 1);
    assert!(channel.message(CHAT_ID, MessageId(1)).await.is_some());
}
