use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<&Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        match &config.endpoint.value {
                            Some(url) => println!("endpoint: {}", url),
                            None => println!("endpoint: (not set)"),
                        }
                        println!("  source: {}", config.endpoint.source);
                        println!();

                        println!("cache_dir: {}", config.cache_dir.value.display());
                        println!("  source: {}", config.cache_dir.source);
                        println!();

                        println!("use_cache: {}", config.use_cache.value);
                        println!("  source: {}", config.use_cache.source);
                        println!();

                        println!("language: {}", config.language.value);
                        println!("  source: {}", config.language.source);

                        if let Some(secs) = config.setup_timeout_secs {
                            println!();
                            println!("setup_timeout_secs: {}", secs);
                        }
                        if config.fetch.max_retries > 0 {
                            println!();
                            println!("fetch.max_retries: {}", config.fetch.max_retries);
                        }
                        if !config.versions.is_empty() {
                            println!();
                            println!("versions:");
                            let mut tables: Vec<_> = config.versions.iter().collect();
                            tables.sort();
                            for (table, version) in tables {
                                println!("  {}: {}", table, version);
                            }
                        }
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(Config::default_config_path);

                if init_config(&config_path)? {
                    println!("Created config file: {}", config_path.display());
                    println!("\nEdit this file to customize your settings.");
                } else {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'masterdata config show' to view current configuration.");
                }
                Ok(())
            }
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# masterdata configuration

# Master data endpoint, queried as <endpoint>?sheet=<table>
# endpoint: https://example.com/masterdata

# Directory for cached tables (default: platform data dir)
# cache_dir: ~/.local/share/masterdata/MasterData

# Trust cached tables when present
use_cache: true

# Language for localized text: ja or en
language: ja

# Abort loading after this many seconds
# setup_timeout_secs: 60

# Retry transient fetch failures
# fetch:
#   max_retries: 3
#   initial_backoff_ms: 500
#   max_backoff_ms: 10000

# Desired table versions; older cached tables are downloaded again
# versions:
#   Card: 2
"#;

/// Writes the default config to `path`. Returns false if a file is already there.
fn init_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(true)
}
