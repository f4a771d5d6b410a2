//! splitprobe CLI main entry point

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{info, warn};

mod cli;
mod commands;
mod utils;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // `config validate` reports loading errors itself
    let validating = matches!(
        &cli.command,
        Some(Commands::Config {
            config_cmd: ConfigCommands::Validate { .. }
        })
    );
    let config = if validating {
        None
    } else {
        Some(utils::load_config(cli.config.as_deref())?)
    };

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    utils::init_tracing(&logging, cli.log_level.as_deref())?;
    info!("splitprobe starting");

    match (cli.command, config) {
        (
            Some(Commands::Run {
                scenarios,
                json,
                serve_after,
            }),
            Some(config),
        ) => {
            let passed = commands::run_command(config, &scenarios, json, serve_after).await?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        (Some(Commands::ServeOrigins), Some(config)) => {
            commands::serve_origins_command(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        (Some(Commands::Config { config_cmd }), _) => {
            match config_cmd {
                ConfigCommands::Validate { config_file } => {
                    let path = config_file.or(cli.config).ok_or_else(|| {
                        anyhow::anyhow!("No configuration file given; use --config-file or --config")
                    })?;
                    commands::config_validate_command(&path)?
                }
                ConfigCommands::Generate { output, force } => {
                    commands::config_generate_command(output.as_deref(), force)?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        (Some(_), None) => Err(anyhow::anyhow!("Configuration was not loaded")),
        (None, _) => {
            warn!("No command specified");
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}
