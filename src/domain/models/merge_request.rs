//! Merge request domain model.
//!
//! A [`MergeRequest`] is a read-only view of the hosting service's data,
//! trimmed down to what notifications need.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a merge request: project id plus project-scoped internal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergeRequestId {
    pub project_id: i64,
    pub iid: i64,
}

impl MergeRequestId {
    pub const fn new(project_id: i64, iid: i64) -> Self {
        Self { project_id, iid }
    }
}

impl fmt::Display for MergeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.project_id, self.iid)
    }
}

impl FromStr for MergeRequestId {
    type Err = String;

    /// Parses the `project!iid` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (project_id, iid) = s
            .split_once('!')
            .ok_or_else(|| format!("expected PROJECT!IID, got '{s}'"))?;
        let project_id = project_id
            .trim()
            .parse()
            .map_err(|_| format!("invalid project id '{project_id}'"))?;
        let iid = iid.trim().parse().map_err(|_| format!("invalid iid '{iid}'"))?;
        Ok(Self::new(project_id, iid))
    }
}

/// Lifecycle state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
}

impl MergeRequestState {
    /// States that have a reconciler attached.
    pub const TRACKED: [Self; 2] = [Self::Opened, Self::Merged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opened" | "open" => Some(Self::Opened),
            "merged" => Some(Self::Merged),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn is_tracked(&self) -> bool {
        Self::TRACKED.contains(self)
    }
}

impl fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merge request as observed on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: MergeRequestId,
    pub title: String,
    pub source_branch: String,
    pub target_branch: String,
    pub web_url: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub state: MergeRequestState,
    /// Unresolved discussion threads, thread id -> short description.
    pub unresolved_threads: BTreeMap<String, String>,
    /// Names of users who up-voted the merge request.
    pub up_voters: BTreeSet<String>,
}

impl MergeRequest {
    /// Ids of the currently unresolved threads.
    pub fn thread_ids(&self) -> BTreeSet<String> {
        self.unresolved_threads.keys().cloned().collect()
    }

    /// Whether anything beyond the base description is worth showing.
    pub fn has_activity(&self) -> bool {
        !self.unresolved_threads.is_empty() || !self.up_voters.is_empty()
    }
}

/// Fetch filter for a [`MergeRequestSource`](crate::domain::ports::MergeRequestSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRequestFilter {
    pub state: MergeRequestState,
    /// Only merge requests updated at or after this instant.
    pub updated_after: Option<DateTime<Utc>>,
}

impl MergeRequestFilter {
    pub const fn by_state(state: MergeRequestState) -> Self {
        Self {
            state,
            updated_after: None,
        }
    }
}
