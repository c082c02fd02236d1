//! Configuration inspection commands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

const MASK: &str = "********";

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration with secrets masked
    Show,
    /// Check the merged configuration and report the first problem
    Validate,
}

#[derive(Debug, serde::Serialize)]
pub struct ConfigShowOutput {
    pub config: Config,
    pub valid: bool,
    pub problem: Option<String>,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        let yaml = serde_yaml::to_string(&self.config).unwrap_or_default();
        match &self.problem {
            None => format!("{yaml}\n# configuration is valid"),
            Some(problem) => format!("{yaml}\n# configuration is invalid: {problem}"),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    pub message: String,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConfigArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_unvalidated(config_path)?;
    let problem = ConfigLoader::validate(&config).err();

    match args.command {
        ConfigCommands::Show => {
            let out = ConfigShowOutput {
                valid: problem.is_none(),
                problem: problem.map(|e| e.to_string()),
                config: masked(config),
            };
            output(&out, json_mode);
        }

        ConfigCommands::Validate => {
            if let Some(problem) = problem {
                return Err(problem).context("Configuration is invalid");
            }
            let out = ConfigValidateOutput {
                valid: true,
                message: format!(
                    "Configuration is valid: {} project(s), chat {}",
                    config.gitlab.project_ids.len(),
                    config.telegram.chat_id
                ),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

/// Replace tokens and proxy password with a fixed mask.
fn masked(mut config: Config) -> Config {
    for secret in [&mut config.gitlab.token, &mut config.telegram.bot_token] {
        if !secret.is_empty() {
            *secret = MASK.to_string();
        }
    }
    if let Some(password) = config
        .telegram
        .proxy
        .as_mut()
        .and_then(|proxy| proxy.password.as_mut())
    {
        *password = MASK.to_string();
    }
    config
}
