//! Sync command: refresh the local cache and build the master data.

use clap::Args;

use super::{open_repository, CommandError, OutputFormat};
use crate::config::Config;
use masterdata::{MasterData, SetupReport, TableSource};

/// Load every table, fetching whatever the cache can't serve
#[derive(Args)]
pub struct SyncCommand {
    /// Ignore cached tables and download everything
    #[arg(long)]
    no_cache: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let md = open_repository(config)?;
        let use_cache = config.use_cache.value && !self.no_cache;

        if let OutputFormat::Json = self.format {
            let report = md.setup(use_cache).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Loading master data...");
        println!();

        let report = md.setup(use_cache).await?;
        print_report(&report);
        println!();
        print_counts(&md);

        println!();
        if report.fetched() > 0 {
            println!("Sync complete.");
        } else {
            println!("Already up to date.");
        }

        Ok(())
    }
}

fn print_report(report: &SetupReport) {
    for entry in &report.tables {
        let status = match entry.source {
            TableSource::Remote => "✓ downloaded",
            TableSource::Cache => "✓ cached",
        };
        println!(
            "  {:<13} {:<9} v{} ({} row{})",
            status,
            entry.table.name(),
            entry.version,
            entry.rows,
            if entry.rows == 1 { "" } else { "s" }
        );
    }
}

fn print_counts(md: &MasterData) {
    println!("Chapters: {}", md.chapters().len());
    println!("Quests:   {}", md.quests().len());
    println!("Events:   {}", md.events().len());
    println!("Texts:    {} ({})", md.text_keys().len(), md.language());
}
