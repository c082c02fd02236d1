//! Assembly of adapters and services from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::gitlab::GitLabMergeRequestSource;
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteNotificationStore};
use crate::adapters::telegram::{parse_locale, TelegramChannel, TelegramMarkdownRenderer};
use crate::domain::models::{Config, MergeRequestState};
use crate::domain::ports::{
    MergeRequestSource, MessageRenderer, NotificationChannel, NotificationStore,
};
use crate::services::{Reconciler, ReconcilerConfig, StrategySelector};

/// Ports shared by every reconciler of a process.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn MergeRequestSource>,
    pub store: Arc<dyn NotificationStore>,
    pub channel: Arc<dyn NotificationChannel>,
    pub renderer: Arc<dyn MessageRenderer>,
}

impl Collaborators {
    fn reconciler(&self, config: ReconcilerConfig) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            config,
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            Arc::clone(&self.channel),
            Arc::clone(&self.renderer),
        ))
    }
}

/// Reconciler settings for `state` taken from the job and chat configuration.
pub fn reconciler_config(state: MergeRequestState, config: &Config) -> ReconcilerConfig {
    let job = match state {
        MergeRequestState::Merged => &config.jobs.merged,
        _ => &config.jobs.opened,
    };
    let reconciler =
        ReconcilerConfig::new(state, config.telegram.chat_id, config.gitlab.project_ids.clone());
    match job.updated_within_hours {
        Some(hours) => reconciler.with_updated_within(chrono::Duration::hours(i64::from(hours))),
        None => reconciler,
    }
}

/// Selector over one reconciler per tracked state.
pub fn build_selector(config: &Config, ports: &Collaborators) -> Result<StrategySelector> {
    let opened = ports.reconciler(reconciler_config(MergeRequestState::Opened, config));
    let merged = ports.reconciler(reconciler_config(MergeRequestState::Merged, config));
    StrategySelector::new(opened, merged).context("Failed to build reconciler table")
}

/// Open the configured database and bring its schema up to date.
pub async fn open_database(config: &Config) -> Result<SqlitePool> {
    initialize_database(
        &config.database.url(),
        Some(PoolConfig::from(&config.database)),
    )
    .await
    .with_context(|| format!("Failed to open database at {}", config.database.path))
}

pub fn sqlite_store(pool: &SqlitePool) -> Arc<dyn NotificationStore> {
    Arc::new(SqliteNotificationStore::new(pool.clone()))
}

pub fn gitlab_source(config: &Config) -> Result<Arc<dyn MergeRequestSource>> {
    let source = GitLabMergeRequestSource::from_config(&config.gitlab)
        .context("Failed to create GitLab client")?;
    Ok(Arc::new(source))
}

pub fn telegram_channel(config: &Config) -> Result<Arc<dyn NotificationChannel>> {
    let channel =
        TelegramChannel::new(&config.telegram).context("Failed to create Telegram client")?;
    Ok(Arc::new(channel))
}

pub fn markdown_renderer(config: &Config) -> Arc<dyn MessageRenderer> {
    let renderer = TelegramMarkdownRenderer::new();
    match parse_locale(&config.telegram.locale) {
        Some(locale) => Arc::new(renderer.with_locale(locale)),
        None => {
            tracing::warn!(locale = %config.telegram.locale, "unknown locale, dates stay in English");
            Arc::new(renderer)
        }
    }
}
