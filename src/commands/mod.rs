mod cache_cmd;
mod config_cmd;
mod show;
mod sync_cmd;

use std::sync::Arc;

use clap::ValueEnum;
use masterdata::{FileCache, HttpFetcher, MasterData, MasterDataError, StorageError};

use crate::config::Config;

pub use cache_cmd::CacheCommand;
pub use config_cmd::ConfigCommand;
pub use show::ShowCommand;
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Builds the repository from configuration.
pub fn open_repository(config: &Config) -> Result<MasterData, CommandError> {
    let endpoint = config
        .endpoint
        .value
        .clone()
        .ok_or(CommandError::NotConfigured)?;

    let fetcher = HttpFetcher::new(endpoint).with_retry(config.fetch.clone());
    let cache = FileCache::new(config.cache_dir.value.clone());

    let mut md = MasterData::new(Arc::new(cache), Arc::new(fetcher))
        .with_language(config.language.value)
        .with_desired_versions(config.versions.clone());
    if let Some(limit) = config.setup_timeout() {
        md = md.with_setup_timeout(limit);
    }

    Ok(md)
}

/// Errors from CLI commands
#[derive(Debug)]
pub enum CommandError {
    /// No endpoint configured
    NotConfigured,
    MasterData(MasterDataError),
    Storage(StorageError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotConfigured => write!(
                f,
                "Endpoint not configured. Add endpoint to config or set MASTERDATA_ENDPOINT."
            ),
            CommandError::MasterData(e) => write!(f, "{}", e),
            CommandError::Storage(e) => write!(f, "{}", e),
            CommandError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::NotConfigured => None,
            CommandError::MasterData(e) => Some(e),
            CommandError::Storage(e) => Some(e),
            CommandError::Json(e) => Some(e),
        }
    }
}

impl From<MasterDataError> for CommandError {
    fn from(e: MasterDataError) -> Self {
        CommandError::MasterData(e)
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Storage(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_repository_requires_endpoint() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load(Some(temp_dir.path().join("none.yaml"))).unwrap();

        let result = open_repository(&config);
        assert!(matches!(result, Err(CommandError::NotConfigured)));
    }

    #[test]
    fn test_open_repository_applies_language() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "endpoint: http://localhost:1/exec").unwrap();
        writeln!(file, "language: en").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        let md = open_repository(&config).unwrap();

        assert_eq!(md.language(), masterdata::Language::En);
        assert!(!md.is_ready());
    }
}
