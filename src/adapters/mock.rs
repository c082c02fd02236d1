//! In-process source and channel for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{ChannelError, DomainError, DomainResult};
use crate::domain::models::{MergeRequest, MergeRequestFilter, MessageId};
use crate::domain::ports::{MergeRequestSource, NotificationChannel};

/// Merge request source backed by a map of project id to merge requests.
pub struct MockMergeRequestSource {
    projects: Arc<RwLock<HashMap<i64, Vec<MergeRequest>>>>,
    failure: Arc<RwLock<Option<String>>>,
    fetches: AtomicUsize,
}

impl MockMergeRequestSource {
    pub fn new() -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
            failure: Arc::new(RwLock::new(None)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Insert or replace a merge request under its project.
    pub async fn upsert(&self, mr: MergeRequest) {
        let mut projects = self.projects.write().await;
        let requests = projects.entry(mr.id.project_id).or_default();
        match requests.iter_mut().find(|existing| existing.id == mr.id) {
            Some(existing) => *existing = mr,
            None => requests.push(mr),
        }
    }

    /// Make every fetch fail until cleared.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Number of fetches served or refused so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockMergeRequestSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MergeRequestSource for MockMergeRequestSource {
    async fn fetch_by_state(
        &self,
        project_id: i64,
        filter: MergeRequestFilter,
    ) -> DomainResult<Vec<MergeRequest>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure.read().await.clone() {
            return Err(DomainError::SourceUnavailable(message));
        }

        let projects = self.projects.read().await;
        Ok(projects
            .get(&project_id)
            .map(|requests| {
                requests
                    .iter()
                    .filter(|mr| mr.state == filter.state)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A call received by [`MockNotificationChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Create {
        chat_id: i64,
        text: String,
    },
    Edit {
        chat_id: i64,
        message_id: MessageId,
        text: String,
    },
    Delete {
        chat_id: i64,
        message_id: MessageId,
    },
}

impl ChannelCall {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Create { text, .. } | Self::Edit { text, .. } => Some(text),
            Self::Delete { .. } => None,
        }
    }
}

/// Channel that keeps posted messages in memory.
///
/// Failed calls are recorded too, so tests can count attempts.
pub struct MockNotificationChannel {
    calls: Arc<RwLock<Vec<ChannelCall>>>,
    messages: Arc<RwLock<HashMap<(i64, MessageId), String>>>,
    failures: Arc<RwLock<Vec<(String, ChannelError)>>>,
    next_id: AtomicI64,
    lenient: bool,
}

impl MockNotificationChannel {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicI64::new(1),
            lenient: false,
        }
    }

    /// Channel that accepts edits and deletes of messages it never posted.
    ///
    /// Used for dry runs over records that point at real messages.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::new()
        }
    }

    /// Fail every create or edit whose text contains `pattern`.
    ///
    /// An empty pattern fails every call, deletes included.
    pub async fn fail_matching(&self, pattern: impl Into<String>, error: ChannelError) {
        self.failures.write().await.push((pattern.into(), error));
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    pub async fn calls(&self) -> Vec<ChannelCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Current text of a live message.
    pub async fn message(&self, chat_id: i64, message_id: MessageId) -> Option<String> {
        self.messages
            .read()
            .await
            .get(&(chat_id, message_id))
            .cloned()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    async fn check(&self, call: ChannelCall) -> Result<(), ChannelError> {
        let text = call.text().map(str::to_owned);
        self.calls.write().await.push(call);

        let failures = self.failures.read().await;
        let failure = failures.iter().find(|(pattern, _)| match &text {
            Some(text) => text.contains(pattern.as_str()),
            None => pattern.is_empty(),
        });
        match failure {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockNotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for MockNotificationChannel {
    async fn create(&self, chat_id: i64, text: &str) -> Result<MessageId, ChannelError> {
        self.check(ChannelCall::Create {
            chat_id,
            text: text.to_string(),
        })
        .await?;

        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.messages
            .write()
            .await
            .insert((chat_id, message_id), text.to_string());
        tracing::info!(chat_id, message_id = message_id.0, text, "mock message created");
        Ok(message_id)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), ChannelError> {
        self.check(ChannelCall::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        })
        .await?;

        let mut messages = self.messages.write().await;
        if !self.lenient && !messages.contains_key(&(chat_id, message_id)) {
            return Err(ChannelError::Rejected("message to edit not found".to_string()));
        }
        messages.insert((chat_id, message_id), text.to_string());
        tracing::info!(chat_id, message_id = message_id.0, text, "mock message edited");
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: MessageId) -> Result<(), ChannelError> {
        self.check(ChannelCall::Delete {
            chat_id,
            message_id,
        })
        .await?;

        match self.messages.write().await.remove(&(chat_id, message_id)) {
            Some(_) => Ok(()),
            None if self.lenient => Ok(()),
            None => Err(ChannelError::Rejected("message to delete not found".to_string())),
        }
    }
}
