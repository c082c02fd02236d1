//! prtbot CLI entry point.

use clap::Parser;

use prtbot::cli::{Cli, Commands};
use prtbot::infrastructure::config::ConfigLoader;
use prtbot::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging settings only; each command loads and validates the full configuration itself.
    let logging = ConfigLoader::load_unvalidated(cli.config.as_deref())
        .map(|config| config.logging)
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => prtbot::cli::commands::run::execute(args, config_path, cli.json).await,
        Commands::Pass(args) => prtbot::cli::commands::pass::execute(args, config_path, cli.json).await,
        Commands::Records(args) => {
            prtbot::cli::commands::records::execute(args, config_path, cli.json).await
        }
        Commands::Config(args) => {
            prtbot::cli::commands::config::execute(args, config_path, cli.json).await
        }
    };

    if let Err(err) = result {
        prtbot::cli::handle_error(err, cli.json);
    }
}
