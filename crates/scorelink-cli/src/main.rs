//! ScoreLink CLI - Command-line interface for ScoreLink
//!
//! Provides commands for:
//! - Viewing and validating configuration
//! - Showing the scoreboard held in the local store
//! - Simulating a paired primary/dependent session over a loopback link

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scorelink_core::config::Config;

mod board;
mod commands;
mod output;

use commands::{config::ConfigCommand, simulate::SimulateCommand, status::StatusCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "scorelink", version, about = "Two-device scoreboard sync")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show the scoreboard stored on this device
    Status(StatusCommand),
    /// Run a scripted two-device session in-process
    Simulate(SimulateCommand),
}

fn init_tracing(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);
    init_tracing(cli.verbose, &config);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
        Commands::Status(cmd) => cmd.execute(format, &config).await,
        Commands::Simulate(cmd) => cmd.execute(format, &config).await,
    }
}
