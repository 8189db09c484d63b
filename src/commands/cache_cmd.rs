use clap::{Args, Subcommand};
use masterdata::{FileCache, Table};

use super::CommandError;
use crate::config::Config;

/// Inspect or reset the local table cache
#[derive(Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Show the cache directory and which tables are cached
    Path,
    /// Delete all cached tables
    Clear,
}

impl CacheCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let cache = FileCache::new(config.cache_dir.value.clone());

        match &self.command {
            CacheSubcommand::Path => {
                println!("{}", cache.cache_dir().display());
                for table in Table::ALL {
                    let mark = if cache.exists(table) { "✓" } else { "-" };
                    println!("  {} {}", mark, table.filename());
                }
            }
            CacheSubcommand::Clear => {
                let removed = cache.clear()?;
                println!(
                    "Removed {} cached table{}.",
                    removed,
                    if removed == 1 { "" } else { "s" }
                );
            }
        }

        Ok(())
    }
}
