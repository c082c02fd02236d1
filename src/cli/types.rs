//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::config::ConfigArgs;
use crate::cli::commands::pass::PassArgs;
use crate::cli::commands::records::RecordsArgs;
use crate::cli::commands::run::RunArgs;
use crate::domain::models::MergeRequestState;

#[derive(Parser)]
#[command(name = "prtbot")]
#[command(about = "prtbot - GitLab merge request notifications for Telegram", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file to use instead of .prtbot/config.yaml and .prtbot/local.yaml
    #[arg(short, long, global = true, env = "PRTBOT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduled reconciliation passes until interrupted
    Run(RunArgs),

    /// Run a single reconciliation pass and exit
    Pass(PassArgs),

    /// Inspect and clean up notification records
    Records(RecordsArgs),

    /// Show or validate the effective configuration
    Config(ConfigArgs),
}

/// Merge request state a pass can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Opened,
    Merged,
}

impl From<StateArg> for MergeRequestState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Opened => Self::Opened,
            StateArg::Merged => Self::Merged,
        }
    }
}
