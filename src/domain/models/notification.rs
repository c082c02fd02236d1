//! Notification record domain model.
//!
//! A [`NotificationRecord`] ties a merge request to the message that
//! announces it, together with the last state that message reflected.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::merge_request::{MergeRequest, MergeRequestId, MergeRequestState};

/// Identifier of a posted message on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// What a notification message showed the last time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub threads: BTreeSet<String>,
    pub up_voters: BTreeSet<String>,
    pub state: MergeRequestState,
}

impl Snapshot {
    /// Snapshot of a merge request as currently observed.
    pub fn of(mr: &MergeRequest) -> Self {
        Self {
            threads: mr.thread_ids(),
            up_voters: mr.up_voters.clone(),
            state: mr.state,
        }
    }

    /// Compare a merge request against this snapshot.
    pub fn delta(&self, mr: &MergeRequest) -> SnapshotDelta {
        let new_threads: BTreeMap<String, String> = mr
            .unresolved_threads
            .iter()
            .filter(|(id, _)| !self.threads.contains(*id))
            .map(|(id, description)| (id.clone(), description.clone()))
            .collect();

        let threads_changed = mr.unresolved_threads.len() != self.threads.len()
            || mr.unresolved_threads.keys().any(|id| !self.threads.contains(id));

        SnapshotDelta {
            new_threads,
            threads_changed,
            up_voters_changed: mr.up_voters != self.up_voters,
            state_changed: mr.state != self.state,
        }
    }
}

/// Difference between an observed merge request and a stored snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    /// Threads unresolved now that the snapshot did not know about.
    pub new_threads: BTreeMap<String, String>,
    pub threads_changed: bool,
    pub up_voters_changed: bool,
    pub state_changed: bool,
}

impl SnapshotDelta {
    pub const fn is_unchanged(&self) -> bool {
        !self.threads_changed && !self.up_voters_changed && !self.state_changed
    }
}

/// Persisted mapping from a merge request to its notification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub merge_request: MergeRequestId,
    pub chat_id: i64,
    pub message_id: MessageId,
    pub last_seen: Snapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Record for a message that was just posted for `mr`.
    pub fn posted(mr: &MergeRequest, chat_id: i64, message_id: MessageId) -> Self {
        let now = Utc::now();
        Self {
            merge_request: mr.id,
            chat_id,
            message_id,
            last_seen: Snapshot::of(mr),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this record whose snapshot reflects `mr`.
    pub fn observed(&self, mr: &MergeRequest) -> Self {
        Self {
            last_seen: Snapshot::of(mr),
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
