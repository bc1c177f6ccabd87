//! Deployer CLI
//!
//! Resolves clients and applications from the client manifest and triggers
//! their deployment pipeline on GitLab.

mod commands;
mod config;

use anyhow::Result;
use clap::{ArgAction, Parser};
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "deployer")]
#[command(about = "Deployer for client applications and databases", long_about = None)]
struct Cli {
    /// Config file (default is .deployer.yaml next to the binary)
    #[arg(long, global = true, env = "DEPLOYER_CONFIG")]
    config: Option<PathBuf>,

    /// Client manifest (default is ./clients.csv)
    #[arg(long = "clientfile", global = true, env = "DEPLOYER_CLIENT_FILE")]
    client_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(client_file) = cli.client_file {
        config.client_file = client_file;
    }

    handle_command(cli.command, &config).await
}

/// Installs the tracing subscriber; `RUST_LOG` takes precedence over `-v`
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let default_filter = format!(
        "deployer={0},deployer_core={0},deployer_client={0},deployer_orchestrator={0}",
        default_level
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
