//! Notification record CLI commands.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::cli::wiring;
use crate::domain::models::{MergeRequestId, NotificationRecord};
use crate::domain::ports::NotificationStore;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordsCommands {
    /// List notification records, most recently updated first
    List {
        /// Maximum number of records to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Show the record of one merge request
    Show {
        /// Merge request as PROJECT!IID, e.g. 7!42
        merge_request: MergeRequestId,
    },
    /// Delete the Telegram message of a merge request and forget its record
    ///
    /// The next pass posts a fresh message if the merge request is still tracked.
    Delete {
        /// Merge request as PROJECT!IID, e.g. 7!42
        merge_request: MergeRequestId,

        /// Forget the record even if the message cannot be deleted
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct RecordOutput {
    pub merge_request: String,
    pub chat_id: i64,
    pub message_id: i64,
    pub state: String,
    pub threads: Vec<String>,
    pub up_voters: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&NotificationRecord> for RecordOutput {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            merge_request: record.merge_request.to_string(),
            chat_id: record.chat_id,
            message_id: record.message_id.0,
            state: record.last_seen.state.to_string(),
            threads: record.last_seen.threads.iter().cloned().collect(),
            up_voters: record.last_seen.up_voters.iter().cloned().collect(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RecordListOutput {
    pub records: Vec<RecordOutput>,
    pub total: usize,
}

impl CommandOutput for RecordListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "merge request",
            "state",
            "message",
            "threads",
            "up-voters",
            "updated",
        ]);
        for record in &self.records {
            table.add_row(vec![
                record.merge_request.clone(),
                record.state.clone(),
                record.message_id.to_string(),
                record.threads.len().to_string(),
                truncate(&record.up_voters.join(", "), 30),
                record.updated_at.clone(),
            ]);
        }
        render_list("record", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for RecordOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Merge request: {}", self.merge_request),
            format!("Chat: {}", self.chat_id),
            format!("Message: {}", self.message_id),
            format!("Last state: {}", self.state),
            format!("Created: {}", self.created_at),
            format!("Updated: {}", self.updated_at),
        ];

        if self.up_voters.is_empty() {
            lines.push("Up-voters: none".to_string());
        } else {
            lines.push(format!("Up-voters: {}", self.up_voters.join(", ")));
        }

        if self.threads.is_empty() {
            lines.push("Unresolved threads: none".to_string());
        } else {
            lines.push(format!("Unresolved threads ({}):", self.threads.len()));
            lines.extend(self.threads.iter().map(|id| format!("  {id}")));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RecordActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for RecordActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RecordsArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_unvalidated(config_path)?;
    let pool = wiring::open_database(&config).await?;
    let store = wiring::sqlite_store(&pool);

    match args.command {
        RecordsCommands::List { limit } => {
            let records = store.list().await?;
            let out = RecordListOutput {
                total: records.len(),
                records: records.iter().take(limit).map(RecordOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        RecordsCommands::Show { merge_request } => {
            let record = find_record(store.as_ref(), merge_request).await?;
            output(&RecordOutput::from(&record), json_mode);
        }

        RecordsCommands::Delete {
            merge_request,
            force,
        } => {
            let record = find_record(store.as_ref(), merge_request).await?;
            ConfigLoader::validate(&config).context("Invalid configuration")?;
            let channel = wiring::telegram_channel(&config)?;

            let message = match channel.delete(record.chat_id, record.message_id).await {
                Ok(()) => format!("Deleted message {} of {merge_request}", record.message_id.0),
                Err(e) if force => {
                    tracing::warn!(merge_request = %merge_request, error = %e, "message not deleted, forgetting record anyway");
                    format!("Could not delete message {} ({e})", record.message_id.0)
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to delete message {} of {merge_request}; use --force to forget the record anyway",
                            record.message_id.0
                        )
                    });
                }
            };

            store.remove(merge_request).await?;
            let out = RecordActionOutput {
                success: true,
                message: format!("{message}; record forgotten"),
            };
            output(&out, json_mode);
        }
    }

    pool.close().await;
    Ok(())
}

async fn find_record(
    store: &dyn NotificationStore,
    merge_request: MergeRequestId,
) -> Result<NotificationRecord> {
    store
        .get(merge_request)
        .await?
        .ok_or_else(|| anyhow!("No notification record for merge request {merge_request}"))
}
