//! GitLab HTTP client.
//!
//! Wraps the parts of the GitLab REST API v4 the notifier reads. All list
//! endpoints are followed page by page through the `x-next-page` header.

use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{GitLabConfig, MergeRequestFilter};
use crate::infrastructure::logging::redact::redact;

use super::models::{GitLabAwardEmoji, GitLabDiscussion, GitLabMergeRequest};

const PER_PAGE: &str = "100";

/// HTTP client for the GitLab REST API v4.
///
/// All methods map HTTP, network and decoding failures to
/// [`DomainError::SourceUnavailable`].
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_url: String,
}

impl GitLabClient {
    pub fn new(config: &GitLabConfig) -> DomainResult<Self> {
        let mut headers = header::HeaderMap::new();
        let mut token = header::HeaderValue::from_str(&config.token)
            .map_err(|_| DomainError::SourceUnavailable("Invalid GitLab token format".to_string()))?;
        token.set_sensitive(true);
        headers.insert("PRIVATE-TOKEN", token);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("prtbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::SourceUnavailable(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    /// List merge requests of a project matching `filter`.
    pub async fn list_merge_requests(
        &self,
        project_id: i64,
        filter: MergeRequestFilter,
    ) -> DomainResult<Vec<GitLabMergeRequest>> {
        let mut query = vec![("state", filter.state.as_str().to_string())];
        if let Some(updated_after) = filter.updated_after {
            query.push(("updated_after", updated_after.to_rfc3339()));
        }

        self.get_all_pages(&format!("/projects/{project_id}/merge_requests"), &query)
            .await
    }

    /// List discussion threads of a merge request.
    pub async fn list_discussions(&self, project_id: i64, iid: i64) -> DomainResult<Vec<GitLabDiscussion>> {
        self.get_all_pages(
            &format!("/projects/{project_id}/merge_requests/{iid}/discussions"),
            &[],
        )
        .await
    }

    /// List award emoji given to a merge request.
    pub async fn list_award_emoji(&self, project_id: i64, iid: i64) -> DomainResult<Vec<GitLabAwardEmoji>> {
        self.get_all_pages(
            &format!("/projects/{project_id}/merge_requests/{iid}/award_emoji"),
            &[],
        )
        .await
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> DomainResult<Vec<T>> {
        let url = self.api_url(endpoint);
        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .http
                .get(&url)
                .query(query)
                .query(&[("page", page.to_string()), ("per_page", PER_PAGE.to_string())])
                .send()
                .await
                .map_err(|e| unavailable(endpoint, &e.to_string()))?;

            let next_page = next_page(&response);
            let data: Vec<T> = Self::handle_response(response, endpoint).await?;
            all_data.extend(data);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        tracing::trace!(endpoint, pages = page, "fetched GitLab collection");
        Ok(all_data)
    }

    async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> DomainResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| unavailable(endpoint, &format!("failed to parse response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
            })
            .unwrap_or(body);

        Err(unavailable(endpoint, &format!("{status}: {message}")))
    }
}

/// Page number from the `x-next-page` header. GitLab sends it empty on the last page.
fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn unavailable(endpoint: &str, detail: &str) -> DomainError {
    DomainError::SourceUnavailable(redact(&format!("GitLab {endpoint} failed: {detail}")))
}
