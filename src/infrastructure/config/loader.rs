use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::adapters::telegram::parse_locale;
use crate::domain::models::config::{Config, JobConfig};

/// Project configuration file, created by hand or by deployment tooling.
pub const PROJECT_CONFIG: &str = ".prtbot/config.yaml";
/// Optional local overrides, kept out of version control.
pub const LOCAL_CONFIG: &str = ".prtbot/local.yaml";
/// Prefix of environment overrides; nesting uses `__`.
pub const ENV_PREFIX: &str = "PRTBOT_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GitLab token is not set (gitlab.token or PRTBOT_GITLAB__TOKEN)")]
    MissingGitLabToken,

    #[error("GitLab base URL cannot be empty")]
    EmptyGitLabUrl,

    #[error("No GitLab projects configured (gitlab.project_ids)")]
    NoProjects,

    #[error("Telegram bot token is not set (telegram.bot_token or PRTBOT_TELEGRAM__BOT_TOKEN)")]
    MissingBotToken,

    #[error("Telegram chat id is not set (telegram.chat_id)")]
    MissingChatId,

    #[error("Invalid messages_per_minute: {0}. Must be at least 1")]
    InvalidRateLimit(u32),

    #[error("Unknown locale: {0}. Expected a name such as en_US or ru_RU")]
    InvalidLocale(String),

    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    #[error("Invalid cron expression for {job} job '{expression}': {reason}")]
    InvalidCron {
        job: &'static str,
        expression: String,
        reason: String,
    },

    #[error("Invalid tick_interval_ms: {0}. Must be at least 1")]
    InvalidTickInterval(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .prtbot/config.yaml
    /// 3. .prtbot/local.yaml
    /// 4. Environment variables (PRTBOT_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config = Self::extract(Self::figment(None))?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file instead of the project files.
    ///
    /// Environment variables still override the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config = Self::extract(Self::figment(Some(path)))
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, from the project files otherwise.
    pub fn load_optional(path: Option<&Path>) -> Result<Config> {
        path.map_or_else(Self::load, Self::load_from_file)
    }

    /// Merged configuration without validation, for display.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Config> {
        Self::extract(Self::figment(path))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(PROJECT_CONFIG))
                .merge(Yaml::file(LOCAL_CONFIG)),
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Config> {
        figment
            .extract()
            .context("Failed to extract configuration from figment")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.gitlab.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyGitLabUrl);
        }
        if config.gitlab.token.is_empty() {
            return Err(ConfigError::MissingGitLabToken);
        }
        if config.gitlab.project_ids.is_empty() {
            return Err(ConfigError::NoProjects);
        }

        if config.telegram.bot_token.is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        if config.telegram.chat_id == 0 {
            return Err(ConfigError::MissingChatId);
        }
        if config.telegram.messages_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(config.telegram.messages_per_minute));
        }
        if parse_locale(&config.telegram.locale).is_none() {
            return Err(ConfigError::InvalidLocale(config.telegram.locale.clone()));
        }
        if let Some(proxy) = &config.telegram.proxy {
            if proxy.host.is_empty() {
                return Err(ConfigError::InvalidProxy("host cannot be empty".to_string()));
            }
            if proxy.port == 0 {
                return Err(ConfigError::InvalidProxy("port cannot be 0".to_string()));
            }
            if proxy.password.is_some() && proxy.user.is_none() {
                return Err(ConfigError::InvalidProxy("password given without user".to_string()));
            }
        }

        if config.jobs.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(config.jobs.tick_interval_ms));
        }
        validate_job("opened", &config.jobs.opened)?;
        validate_job("merged", &config.jobs.merged)?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        Ok(())
    }
}

fn validate_job(job: &'static str, config: &JobConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }
    cron::Schedule::from_str(&config.cron)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidCron {
            job,
            expression: config.cron.clone(),
            reason: e.to_string(),
        })
}
