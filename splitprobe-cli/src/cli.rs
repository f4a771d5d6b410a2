//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use splitprobe_harness::ScenarioKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the router and run verification scenarios
    Run {
        /// Scenario to run; repeat for several (default: all)
        #[arg(long = "scenario", value_name = "NAME")]
        scenarios: Vec<ScenarioKind>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Keep the mock origins serving after the run until Ctrl+C
        #[arg(long)]
        serve_after: bool,
    },

    /// Start only the mock origin fleet and serve until Ctrl+C
    ServeOrigins,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (defaults to --config)
        #[arg(long, value_name = "PATH")]
        config_file: Option<PathBuf>,
    },

    /// Write a sample configuration with every default filled in
    Generate {
        /// Output file path (stdout when omitted)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
