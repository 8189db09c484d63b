use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{CacheCommand, ConfigCommand, ShowCommand, SyncCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "masterdata")]
#[command(version)]
#[command(about = "Sync, cache and inspect master data tables", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all tables, downloading whatever the cache can't serve
    Sync(SyncCommand),

    /// Look up cards, items, chapters, quests, events and texts
    Show(ShowCommand),

    /// Inspect or clear the local cache
    Cache(CacheCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "masterdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::Sync(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Show(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Cache(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli.config.as_deref())?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
