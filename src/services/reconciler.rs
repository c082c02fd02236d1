//! Reconciliation of notification messages with live merge requests.
//!
//! A [`Reconciler`] owns one tracked merge request state. Each call to
//! [`Reconciler::process`] fetches the merge requests currently in that
//! state and drives the channel and store towards them:
//!
//! - no record: post a message, then persist a record for it;
//! - record with a stale snapshot: edit the message, then refresh the snapshot;
//! - record with a current snapshot: nothing.
//!
//! Channel failures skip the merge request and leave the store as it was,
//! so the next pass derives the same action again. Source and store
//! failures abort the pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    MergeRequest, MergeRequestFilter, MergeRequestState, NotificationRecord,
};
use crate::domain::ports::{
    MergeRequestSource, MessageRenderer, NotificationChannel, NotificationStore,
};

/// Configuration of a reconciler for one tracked state.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// State whose merge requests this reconciler announces.
    pub target_state: MergeRequestState,
    /// Chat that receives newly created messages.
    pub chat_id: i64,
    /// Projects to fetch merge requests from.
    pub project_ids: Vec<i64>,
    /// Restrict the fetch to merge requests updated within this window.
    pub updated_within: Option<chrono::Duration>,
}

impl ReconcilerConfig {
    pub fn new(target_state: MergeRequestState, chat_id: i64, project_ids: Vec<i64>) -> Self {
        Self {
            target_state,
            chat_id,
            project_ids,
            updated_within: None,
        }
    }

    pub const fn with_updated_within(mut self, window: chrono::Duration) -> Self {
        self.updated_within = Some(window);
        self
    }

    fn filter(&self, now: DateTime<Utc>) -> MergeRequestFilter {
        MergeRequestFilter {
            state: self.target_state,
            updated_after: self.updated_within.map(|window| now - window),
        }
    }
}

/// What a pass did to a single merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created,
    Edited,
    Unchanged,
    /// The channel refused the create or edit; retried next pass.
    Failed,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub state: MergeRequestState,
    pub fetched: usize,
    pub created: usize,
    pub edited: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PassReport {
    fn start(state: MergeRequestState) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            state,
            fetched: 0,
            created: 0,
            edited: 0,
            unchanged: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Edited => self.edited += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of channel writes the pass issued successfully.
    pub const fn writes(&self) -> usize {
        self.created + self.edited
    }
}

/// Converges notifications for one tracked merge request state.
pub struct Reconciler {
    config: ReconcilerConfig,
    source: Arc<dyn MergeRequestSource>,
    store: Arc<dyn NotificationStore>,
    channel: Arc<dyn NotificationChannel>,
    renderer: Arc<dyn MessageRenderer>,
}

impl Reconciler {
    pub fn new(
        config: ReconcilerConfig,
        source: Arc<dyn MergeRequestSource>,
        store: Arc<dyn NotificationStore>,
        channel: Arc<dyn NotificationChannel>,
        renderer: Arc<dyn MessageRenderer>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            channel,
            renderer,
        }
    }

    pub const fn target_state(&self) -> MergeRequestState {
        self.config.target_state
    }

    /// Run one reconciliation pass.
    pub async fn process(&self) -> DomainResult<PassReport> {
        let mut report = PassReport::start(self.config.target_state);
        let span = tracing::info_span!(
            "reconcile_pass",
            state = %report.state,
            pass_id = %report.pass_id,
        );

        async move {
            let requests = self.fetch_all().await?;
            report.fetched = requests.len();

            for mr in &requests {
                let outcome = self.reconcile(mr).await?;
                report.record(outcome);
            }

            report.finished_at = Some(Utc::now());
            tracing::info!(
                fetched = report.fetched,
                created = report.created,
                edited = report.edited,
                unchanged = report.unchanged,
                failed = report.failed,
                "reconciliation pass finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Fetch every configured project before touching anything.
    async fn fetch_all(&self) -> DomainResult<Vec<MergeRequest>> {
        let filter = self.config.filter(Utc::now());
        let mut requests = Vec::new();

        for &project_id in &self.config.project_ids {
            let batch = self
                .source
                .fetch_by_state(project_id, filter)
                .await
                .inspect_err(|e| {
                    tracing::error!(project_id, error = %e, "failed to fetch merge requests, aborting pass");
                })?;

            tracing::debug!(project_id, count = batch.len(), "fetched merge requests");
            requests.extend(batch.into_iter().filter(|mr| {
                let keep = mr.state == filter.state;
                if !keep {
                    tracing::debug!(merge_request = %mr.id, state = %mr.state, "skipping merge request in unexpected state");
                }
                keep
            }));
        }

        Ok(requests)
    }

    async fn reconcile(&self, mr: &MergeRequest) -> DomainResult<ItemOutcome> {
        match self.store.get(mr.id).await? {
            None => self.announce(mr).await,
            Some(record) => self.refresh(mr, &record).await,
        }
    }

    async fn announce(&self, mr: &MergeRequest) -> DomainResult<ItemOutcome> {
        // The persisted snapshot is the current one, so the message has to show it too.
        let text = if mr.has_activity() {
            self.renderer
                .render_update(mr, &mr.unresolved_threads, &mr.up_voters)
        } else {
            self.renderer.render_message(mr)
        };

        let chat_id = self.config.chat_id;
        match self.channel.create(chat_id, &text).await {
            Ok(message_id) => {
                let record = NotificationRecord::posted(mr, chat_id, message_id);
                self.store.put(&record).await?;
                tracing::info!(merge_request = %mr.id, message_id = message_id.0, "notification created");
                Ok(ItemOutcome::Created)
            }
            Err(e) => {
                tracing::warn!(merge_request = %mr.id, error = %e, "failed to create notification");
                Ok(ItemOutcome::Failed)
            }
        }
    }

    async fn refresh(
        &self,
        mr: &MergeRequest,
        record: &NotificationRecord,
    ) -> DomainResult<ItemOutcome> {
        let delta = record.last_seen.delta(mr);
        if delta.is_unchanged() {
            tracing::trace!(merge_request = %mr.id, "notification up to date");
            return Ok(ItemOutcome::Unchanged);
        }

        let text = self
            .renderer
            .render_update(mr, &delta.new_threads, &mr.up_voters);

        match self
            .channel
            .edit(record.chat_id, record.message_id, &text)
            .await
        {
            Ok(()) => {
                self.store.put(&record.observed(mr)).await?;
                tracing::info!(
                    merge_request = %mr.id,
                    message_id = record.message_id.0,
                    new_threads = delta.new_threads.len(),
                    up_voters = mr.up_voters.len(),
                    state_changed = delta.state_changed,
                    "notification updated"
                );
                Ok(ItemOutcome::Edited)
            }
            Err(e) => {
                tracing::warn!(
                    merge_request = %mr.id,
                    message_id = record.message_id.0,
                    error = %e,
                    "failed to update notification"
                );
                Ok(ItemOutcome::Failed)
            }
        }
    }
}
