//! Telegram Bot API implementation of the NotificationChannel port.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use teloxide::prelude::*;
use teloxide::types::{ChatId, LinkPreviewOptions, ParseMode};
use teloxide::RequestError;

use crate::domain::errors::ChannelError;
use crate::domain::models::{MessageId, TelegramConfig};
use crate::domain::ports::NotificationChannel;
use crate::infrastructure::logging::redact::SecretRedactor;

/// Posts notifications through a Telegram bot.
///
/// Outgoing calls share one client-side rate limiter so a burst of new
/// merge requests does not trip Telegram's per-chat limits.
pub struct TelegramChannel {
    bot: Bot,
    limiter: DefaultDirectRateLimiter,
    redactor: SecretRedactor,
    secrets: Vec<String>,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self, ChannelError> {
        let bot = match &config.proxy {
            Some(proxy) => {
                let mut socks = reqwest::Proxy::all(proxy.url())
                    .map_err(|e| ChannelError::Transport(format!("invalid proxy: {e}")))?;
                if let Some(user) = &proxy.user {
                    socks = socks.basic_auth(user, proxy.password.as_deref().unwrap_or_default());
                }
                let client = teloxide::net::default_reqwest_settings()
                    .proxy(socks)
                    .build()
                    .map_err(|e| ChannelError::Transport(format!("failed to build HTTP client: {e}")))?;
                tracing::info!(proxy = %proxy.url(), "routing Telegram traffic through proxy");
                Bot::with_client(&config.bot_token, client)
            }
            None => Bot::new(&config.bot_token),
        };

        let per_minute = NonZeroU32::new(config.messages_per_minute).unwrap_or(NonZeroU32::MIN);

        let mut secrets = vec![config.bot_token.clone()];
        if let Some(password) = config.proxy.as_ref().and_then(|p| p.password.clone()) {
            secrets.push(password);
        }

        Ok(Self {
            bot,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            redactor: SecretRedactor::new(),
            secrets,
        })
    }

    /// Send requests to another Bot API server.
    pub fn with_api_url(mut self, url: reqwest::Url) -> Self {
        self.bot = self.bot.set_api_url(url);
        self
    }

    fn classify(&self, action: &str, err: &RequestError) -> ChannelError {
        let secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        let message = self
            .redactor
            .scrub_with(&format!("failed to {action} message: {err}"), &secrets);
        match err {
            RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_) => {
                ChannelError::Transport(message)
            }
            _ => ChannelError::Rejected(message),
        }
    }
}

fn telegram_message_id(message_id: MessageId) -> Result<teloxide::types::MessageId, ChannelError> {
    i32::try_from(message_id.0)
        .map(teloxide::types::MessageId)
        .map_err(|_| ChannelError::InvalidReference(format!("message id {} out of range", message_id.0)))
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    #[allow(deprecated)]
    async fn create(&self, chat_id: i64, text: &str) -> Result<MessageId, ChannelError> {
        self.limiter.until_ready().await;

        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Markdown)
            .link_preview_options(no_preview())
            .await
            .map_err(|e| self.classify("send", &e))?;

        Ok(MessageId(i64::from(sent.id.0)))
    }

    #[allow(deprecated)]
    async fn edit(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), ChannelError> {
        let msg_id = telegram_message_id(message_id)?;
        self.limiter.until_ready().await;

        match self
            .bot
            .edit_message_text(ChatId(chat_id), msg_id, text)
            .parse_mode(ParseMode::Markdown)
            .link_preview_options(no_preview())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => {
                tracing::debug!(chat_id, message_id = message_id.0, "message already up to date");
                Ok(())
            }
            Err(e) => Err(self.classify("edit", &e)),
        }
    }

    async fn delete(&self, chat_id: i64, message_id: MessageId) -> Result<(), ChannelError> {
        let msg_id = telegram_message_id(message_id)?;
        self.limiter.until_ready().await;

        self.bot
            .delete_message(ChatId(chat_id), msg_id)
            .await
            .map_err(|e| self.classify("delete", &e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:TEST-token-for-mock-server-only";

    fn channel_for(server: &mockito::Server) -> TelegramChannel {
        let config = TelegramConfig {
            bot_token: TOKEN.to_string(),
            chat_id: -100,
            ..TelegramConfig::default()
        };
        TelegramChannel::new(&config)
            .unwrap()
            .with_api_url(reqwest::Url::parse(&server.url()).unwrap())
    }

    fn method_path(method: &str) -> mockito::Matcher {
        mockito::Matcher::Regex(format!("(?i)^/bot[^/]+/{method}$"))
    }

    #[test]
    fn test_message_id_range() {
        assert_eq!(telegram_message_id(MessageId(42)).unwrap().0, 42);
        assert!(matches!(
            telegram_message_id(MessageId(i64::from(i32::MAX) + 1)),
            Err(ChannelError::InvalidReference(_))
        ));
    }

    #[tokio::test]
    async fn test_not_modified_edit_counts_as_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", method_path("editMessageText"))
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: message is not modified: specified new message content and reply markup are exactly the same as a current content and reply markup of the message"}"#)
            .create_async()
            .await;

        let result = channel_for(&server).edit(-100, MessageId(5), "same text").await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_rejected_without_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", method_path("sendMessage"))
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let err = channel_for(&server).create(-100, "hello").await.unwrap_err();

        match err {
            ChannelError::Rejected(message) => {
                assert!(message.contains("chat not found"));
                assert!(!message.contains(TOKEN));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_id_fails_before_request() {
        let server = mockito::Server::new_async().await;
        let err = channel_for(&server)
            .delete(-100, MessageId(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidReference(_)));
    }
}
