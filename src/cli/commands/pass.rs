//! One-shot reconciliation pass.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::memory::InMemoryNotificationStore;
use crate::adapters::mock::{ChannelCall, MockNotificationChannel};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::StateArg;
use crate::cli::wiring::{self, Collaborators};
use crate::domain::models::{Config, MergeRequestState};
use crate::domain::ports::{MergeRequestSource, NotificationStore};
use crate::infrastructure::config::ConfigLoader;
use crate::services::PassReport;

#[derive(Args, Debug)]
pub struct PassArgs {
    /// Merge request state to reconcile
    #[arg(value_enum)]
    pub state: StateArg,

    /// Fetch from GitLab but only print what would be posted or edited
    #[arg(long)]
    pub dry_run: bool,
}

/// A message the pass would have sent.
#[derive(Debug, serde::Serialize)]
pub struct PlannedMessage {
    pub action: &'static str,
    pub message_id: Option<i64>,
    pub text: String,
}

impl From<&ChannelCall> for PlannedMessage {
    fn from(call: &ChannelCall) -> Self {
        match call {
            ChannelCall::Create { text, .. } => Self {
                action: "create",
                message_id: None,
                text: text.clone(),
            },
            ChannelCall::Edit {
                message_id, text, ..
            } => Self {
                action: "edit",
                message_id: Some(message_id.0),
                text: text.clone(),
            },
            ChannelCall::Delete { message_id, .. } => Self {
                action: "delete",
                message_id: Some(message_id.0),
                text: String::new(),
            },
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PassOutput {
    pub report: PassReport,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedMessage>,
}

impl CommandOutput for PassOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![
            format!(
                "{} pass {}{}",
                report.state,
                report.pass_id,
                if self.dry_run { " (dry run)" } else { "" }
            ),
            format!("Fetched: {}", report.fetched),
            format!("Created: {}", report.created),
            format!("Edited: {}", report.edited),
            format!("Unchanged: {}", report.unchanged),
            format!("Failed: {}", report.failed),
        ];

        for planned in &self.planned {
            let target = planned
                .message_id
                .map_or_else(|| "new message".to_string(), |id| format!("message {id}"));
            lines.push(format!("\n--- {} {} ---\n{}", planned.action, target, planned.text));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PassArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_optional(config_path).context("Invalid configuration")?;
    let state = MergeRequestState::from(args.state);

    let out = if args.dry_run {
        dry_run(&config, state).await?
    } else {
        live(&config, state).await?
    };

    output(&out, json_mode);
    Ok(())
}

async fn live(config: &Config, state: MergeRequestState) -> Result<PassOutput> {
    let pool = wiring::open_database(config).await?;
    let ports = Collaborators {
        source: wiring::gitlab_source(config)?,
        store: wiring::sqlite_store(&pool),
        channel: wiring::telegram_channel(config)?,
        renderer: wiring::markdown_renderer(config),
    };
    let selector = wiring::build_selector(config, &ports)?;

    let report = selector
        .process(state)
        .await
        .with_context(|| format!("{state} pass failed"))?;
    pool.close().await;

    Ok(PassOutput {
        report,
        dry_run: false,
        planned: Vec::new(),
    })
}

/// Real fetch, recorded channel, throwaway store seeded from the database.
async fn dry_run(config: &Config, state: MergeRequestState) -> Result<PassOutput> {
    let store = InMemoryNotificationStore::new();
    if Path::new(&config.database.path).exists() {
        let pool = wiring::open_database(config).await?;
        for record in wiring::sqlite_store(&pool).list().await? {
            store.put(&record).await?;
        }
        pool.close().await;
    } else {
        tracing::info!(path = %config.database.path, "no database yet, every merge request counts as new");
    }

    plan(config, state, wiring::gitlab_source(config)?, store).await
}

/// Run a pass over `store` with a recording channel and collect what it would send.
async fn plan(
    config: &Config,
    state: MergeRequestState,
    source: Arc<dyn MergeRequestSource>,
    store: InMemoryNotificationStore,
) -> Result<PassOutput> {
    let channel = Arc::new(MockNotificationChannel::lenient());
    let ports = Collaborators {
        source,
        store: Arc::new(store),
        channel: channel.clone(),
        renderer: wiring::markdown_renderer(config),
    };
    let selector = wiring::build_selector(config, &ports)?;

    let report = selector
        .process(state)
        .await
        .with_context(|| format!("{state} dry run failed"))?;
    let planned = channel.calls().await.iter().map(PlannedMessage::from).collect();

    Ok(PassOutput {
        report,
        dry_run: true,
        planned,
    })
}
