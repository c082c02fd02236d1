//! GitLab implementation of the MergeRequestSource port.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    GitLabConfig, MergeRequest, MergeRequestFilter, MergeRequestId, MergeRequestState,
};
use crate::domain::ports::MergeRequestSource;

use super::client::GitLabClient;
use super::models::{GitLabAwardEmoji, GitLabDiscussion, GitLabMergeRequest};

/// Reads merge requests together with their threads and up-votes.
pub struct GitLabMergeRequestSource {
    client: GitLabClient,
    upvote_emoji: String,
}

impl GitLabMergeRequestSource {
    pub fn new(client: GitLabClient, upvote_emoji: impl Into<String>) -> Self {
        Self {
            client,
            upvote_emoji: upvote_emoji.into(),
        }
    }

    pub fn from_config(config: &GitLabConfig) -> DomainResult<Self> {
        Ok(Self::new(GitLabClient::new(config)?, config.upvote_emoji.clone()))
    }

    async fn enrich(&self, raw: GitLabMergeRequest) -> DomainResult<Option<MergeRequest>> {
        let Some(state) = MergeRequestState::from_str(&raw.state) else {
            tracing::debug!(project_id = raw.project_id, iid = raw.iid, state = %raw.state, "skipping merge request in unknown state");
            return Ok(None);
        };

        let discussions = self.client.list_discussions(raw.project_id, raw.iid).await?;
        let award_emoji = self.client.list_award_emoji(raw.project_id, raw.iid).await?;

        Ok(Some(MergeRequest {
            id: MergeRequestId::new(raw.project_id, raw.iid),
            title: raw.title,
            source_branch: raw.source_branch,
            target_branch: raw.target_branch,
            web_url: raw.web_url,
            author_name: raw.author.name,
            created_at: raw.created_at,
            state,
            unresolved_threads: unresolved_threads(&discussions),
            up_voters: up_voters(&award_emoji, &self.upvote_emoji),
        }))
    }
}

fn unresolved_threads(discussions: &[GitLabDiscussion]) -> BTreeMap<String, String> {
    discussions
        .iter()
        .filter(|d| d.is_unresolved())
        .map(|d| (d.id.clone(), d.description()))
        .collect()
}

fn up_voters(award_emoji: &[GitLabAwardEmoji], emoji: &str) -> BTreeSet<String> {
    award_emoji
        .iter()
        .filter(|award| award.name == emoji)
        .map(|award| award.user.name.clone())
        .collect()
}

#[async_trait]
impl MergeRequestSource for GitLabMergeRequestSource {
    async fn fetch_by_state(
        &self,
        project_id: i64,
        filter: MergeRequestFilter,
    ) -> DomainResult<Vec<MergeRequest>> {
        let raw = self.client.list_merge_requests(project_id, filter).await?;

        let mut requests = Vec::with_capacity(raw.len());
        for mr in raw {
            if let Some(mr) = self.enrich(mr).await? {
                requests.push(mr);
            }
        }
        Ok(requests)
    }
}
