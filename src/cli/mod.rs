//! Command-line interface definitions.

pub mod check;
pub mod events;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Event orchestrator for trading signal pipelines.
#[derive(Parser, Debug)]
#[command(name = "event-orchestrator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the orchestrator in the foreground until Ctrl-C
    Run(RunArgs),

    /// List the built-in event catalogue
    Events(EventsArgs),

    /// Validate a configuration file
    CheckConfig(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Override queue capacity
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Override health check interval in milliseconds
    #[arg(long)]
    pub health_interval_ms: Option<u64>,
}

/// Arguments for the `events` subcommand.
#[derive(Parser, Debug)]
pub struct EventsArgs {
    /// Print definitions as JSON
    #[arg(long)]
    pub json: bool,
}
