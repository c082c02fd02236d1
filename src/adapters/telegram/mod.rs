//! Telegram notification channel and message rendering.

pub mod channel;
pub mod format;

pub use channel::TelegramChannel;
pub use format::{parse_locale, TelegramMarkdownRenderer, DEFAULT_LOCALE};
