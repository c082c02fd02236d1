use serde::{Deserialize, Serialize};

/// Main configuration structure for prtbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// GitLab connection settings
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// Telegram connection settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Reconciliation pass schedules
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitLab configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GitLabConfig {
    /// Base URL of the GitLab instance
    #[serde(default = "default_gitlab_url")]
    pub base_url: String,

    /// Personal access token (read_api scope is enough)
    #[serde(default)]
    pub token: String,

    /// Projects whose merge requests are announced
    #[serde(default)]
    pub project_ids: Vec<i64>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Award emoji that counts as an up-vote
    #[serde(default = "default_upvote_emoji")]
    pub upvote_emoji: String,
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_upvote_emoji() -> String {
    "thumbsup".to_string()
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_gitlab_url(),
            token: String::new(),
            project_ids: vec![],
            timeout_secs: default_timeout_secs(),
            upvote_emoji: default_upvote_emoji(),
        }
    }
}

/// Telegram configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Chat that receives new notifications
    #[serde(default)]
    pub chat_id: i64,

    /// Optional SOCKS5 proxy for reaching the Bot API
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Client-side cap on outgoing messages per minute
    #[serde(default = "default_messages_per_minute")]
    pub messages_per_minute: u32,

    /// Locale for month names in message dates, e.g. `ru_RU`
    #[serde(default = "default_locale")]
    pub locale: String,
}

const fn default_messages_per_minute() -> u32 {
    20
}

fn default_locale() -> String {
    "en_US".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: 0,
            proxy: None,
            messages_per_minute: default_messages_per_minute(),
            locale: default_locale(),
        }
    }
}

/// SOCKS5 proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL without credentials.
    pub fn url(&self) -> String {
        format!("socks5://{}:{}", self.host, self.port)
    }
}

/// Schedules for the reconciliation passes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobsConfig {
    /// How often the scheduler checks whether a pass is due
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Pass over opened merge requests
    #[serde(default = "JobConfig::opened")]
    pub opened: JobConfig,

    /// Pass over merged merge requests
    #[serde(default = "JobConfig::merged")]
    pub merged: JobConfig,
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            opened: JobConfig::opened(),
            merged: JobConfig::merged(),
        }
    }
}

/// Schedule of a single pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression with seconds (sec min hour dom month dow)
    pub cron: String,

    /// Only look at merge requests updated within this many hours
    #[serde(default)]
    pub updated_within_hours: Option<u32>,
}

const fn default_true() -> bool {
    true
}

impl JobConfig {
    fn opened() -> Self {
        Self {
            enabled: true,
            cron: "0 */5 * * * *".to_string(),
            updated_within_hours: None,
        }
    }

    fn merged() -> Self {
        Self {
            enabled: true,
            cron: "30 */10 * * * *".to_string(),
            updated_within_hours: Some(24),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".prtbot/prtbot.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// sqlx connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format of the stdout layer
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Rotation of log files
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}
