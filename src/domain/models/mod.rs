pub mod config;
pub mod merge_request;
pub mod notification;

pub use config::{
    Config, DatabaseConfig, GitLabConfig, JobConfig, JobsConfig, LogFormat, LoggingConfig, ProxyConfig,
    RotationPolicy, TelegramConfig,
};
pub use merge_request::{MergeRequest, MergeRequestFilter, MergeRequestId, MergeRequestState};
pub use notification::{MessageId, NotificationRecord, Snapshot, SnapshotDelta};
