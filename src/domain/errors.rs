//! Domain errors for the merge-request notification bot.
//!
//! Channel failures are a separate type because they only skip the merge
//! request at hand. Every [`DomainError`] aborts the pass that raised it.

use thiserror::Error;

use super::models::merge_request::MergeRequestState;

/// Failure reported by a [`NotificationChannel`](crate::domain::ports::NotificationChannel).
///
/// Always recoverable: the reconciler logs it and retries on the next pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Messaging platform rejected the request: {0}")]
    Rejected(String),

    #[error("Messaging platform unreachable: {0}")]
    Transport(String),

    #[error("Invalid message reference: {0}")]
    InvalidReference(String),
}

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Merge request source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Notification store error: {0}")]
    Store(String),

    #[error("Unsupported merge request state: {0}")]
    UnsupportedState(MergeRequestState),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_errors_map_to_store() {
        let err = DomainError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::UnsupportedState(MergeRequestState::Closed);
        assert_eq!(err.to_string(), "Unsupported merge request state: closed");
    }
}
