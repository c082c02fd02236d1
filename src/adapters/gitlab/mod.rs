//! GitLab merge request source.

pub mod client;
pub mod models;
pub mod source;

pub use client::GitLabClient;
pub use source::GitLabMergeRequestSource;
