//! Port for the messaging platform that carries notifications.

use async_trait::async_trait;

use crate::domain::errors::ChannelError;
use crate::domain::models::MessageId;

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Post a new message and return its id.
    async fn create(&self, chat_id: i64, text: &str) -> Result<MessageId, ChannelError>;

    /// Replace the text of a previously posted message.
    async fn edit(&self, chat_id: i64, message_id: MessageId, text: &str)
        -> Result<(), ChannelError>;

    /// Delete a previously posted message.
    async fn delete(&self, chat_id: i64, message_id: MessageId) -> Result<(), ChannelError>;
}
