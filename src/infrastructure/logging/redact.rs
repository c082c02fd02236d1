//! Removes credentials from text that is about to be logged or returned.
//!
//! Telegram errors carry the request URL, and the Bot API puts the bot token
//! in the path. GitLab tokens travel in a header but may be echoed in bodies.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static REDACTOR: LazyLock<SecretRedactor> = LazyLock::new(SecretRedactor::new);

/// Redact `message` with the shared redactor.
pub fn redact(message: &str) -> String {
    REDACTOR.scrub(message)
}

/// Pattern-based secret scrubber.
#[derive(Clone)]
pub struct SecretRedactor {
    bot_token_pattern: Regex,
    gitlab_token_pattern: Regex,
    header_pattern: Regex,
    password_pattern: Regex,
    url_credentials_pattern: Regex,
}

impl SecretRedactor {
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            // 123456789:AAE...
            bot_token_pattern: Regex::new(r"\d{5,}:[A-Za-z0-9_-]{30,}").expect("valid regex"),
            gitlab_token_pattern: Regex::new(r"gl(?:pat|dt|oas|rt)-[A-Za-z0-9_-]{20,}").expect("valid regex"),
            header_pattern: Regex::new(r"(?i)(private-token|authorization)\s*[:=]\s*\S+").expect("valid regex"),
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#)
                .expect("valid regex"),
            url_credentials_pattern: Regex::new(r"(socks5h?|https?)://[^:/@\s]+:[^@/\s]+@").expect("valid regex"),
        }
    }

    /// Scrub a message of known credential shapes.
    pub fn scrub(&self, message: &str) -> String {
        let mut scrubbed = self
            .bot_token_pattern
            .replace_all(message, "[BOT_TOKEN_REDACTED]")
            .to_string();
        scrubbed = self
            .gitlab_token_pattern
            .replace_all(&scrubbed, "[TOKEN_REDACTED]")
            .to_string();
        scrubbed = self
            .header_pattern
            .replace_all(&scrubbed, "$1: [REDACTED]")
            .to_string();
        scrubbed = self
            .password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .to_string();
        self.url_credentials_pattern
            .replace_all(&scrubbed, "$1://[REDACTED]@")
            .to_string()
    }

    /// Scrub known shapes and then every occurrence of the given secrets.
    pub fn scrub_with(&self, message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(self.scrub(message), |text, secret| text.replace(secret, "[REDACTED]"))
    }
}

impl Default for SecretRedactor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretRedactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRedactor").finish()
    }
}
