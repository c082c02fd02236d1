//! GitLab REST API v4 response models.
//!
//! Only the fields the notifier reads are mapped; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A merge request as returned by `GET /projects/:id/merge_requests`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub source_branch: String,
    pub target_branch: String,
    pub web_url: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub author: GitLabUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub name: String,
    #[serde(default)]
    pub username: String,
}

/// A discussion thread on a merge request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabDiscussion {
    pub id: String,
    #[serde(default)]
    pub notes: Vec<GitLabNote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNote {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub resolvable: bool,
    #[serde(default)]
    pub resolved: Option<bool>,
}

impl GitLabNote {
    pub fn is_unresolved(&self) -> bool {
        self.resolvable && !self.resolved.unwrap_or(false)
    }
}

/// Longest thread description shown in a notification, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 80;

impl GitLabDiscussion {
    /// A thread is unresolved while any of its resolvable notes is.
    pub fn is_unresolved(&self) -> bool {
        self.notes.iter().any(GitLabNote::is_unresolved)
    }

    /// First line of the opening note, cut to [`DESCRIPTION_MAX_CHARS`].
    pub fn description(&self) -> String {
        let first_line = self
            .notes
            .first()
            .and_then(|note| note.body.lines().next())
            .unwrap_or_default()
            .trim();

        if first_line.chars().count() > DESCRIPTION_MAX_CHARS {
            let cut: String = first_line.chars().take(DESCRIPTION_MAX_CHARS - 1).collect();
            format!("{}…", cut.trim_end())
        } else {
            first_line.to_string()
        }
    }
}

/// An award emoji on a merge request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabAwardEmoji {
    pub name: String,
    pub user: GitLabUser,
}
