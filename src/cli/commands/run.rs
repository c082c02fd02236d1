//! Long-running scheduler command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::cli::wiring::{self, Collaborators};
use crate::infrastructure::config::ConfigLoader;
use crate::services::PassScheduler;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds to wait for in-flight passes after an interrupt
    #[arg(long, default_value = "30")]
    pub shutdown_timeout: u64,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    pub success: bool,
    pub passes: Vec<String>,
    pub message: String,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_optional(config_path).context("Invalid configuration")?;

    let pool = wiring::open_database(&config).await?;
    let ports = Collaborators {
        source: wiring::gitlab_source(&config)?,
        store: wiring::sqlite_store(&pool),
        channel: wiring::telegram_channel(&config)?,
        renderer: wiring::markdown_renderer(&config),
    };
    let selector = Arc::new(wiring::build_selector(&config, &ports)?);

    let scheduler = PassScheduler::from_config(selector, &config.jobs)
        .context("Failed to schedule reconciliation passes")?;
    let passes: Vec<String> = scheduler
        .schedules()
        .iter()
        .map(|s| format!("{} ({})", s.state, s.expression))
        .collect();

    if passes.is_empty() {
        tracing::warn!("every pass is disabled, nothing to do");
    }

    tracing::info!(
        projects = ?config.gitlab.project_ids,
        chat_id = config.telegram.chat_id,
        passes = ?passes,
        "prtbot started"
    );
    let mut handles = scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested, waiting for running passes");
    scheduler.stop();

    let drain = futures::future::join_all(handles.iter_mut());
    if tokio::time::timeout(Duration::from_secs(args.shutdown_timeout), drain)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = args.shutdown_timeout,
            "passes still running at shutdown timeout, aborting"
        );
        for handle in &handles {
            handle.abort();
        }
    }

    pool.close().await;

    let out = RunOutput {
        success: true,
        passes,
        message: "prtbot stopped".to_string(),
    };
    output(&out, json_mode);
    Ok(())
}
