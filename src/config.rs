use masterdata::{Language, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Master data endpoint, queried as `{endpoint}?sheet={table}`
    pub endpoint: ConfigValue<Option<String>>,
    /// Directory holding cached tables
    pub cache_dir: ConfigValue<PathBuf>,
    /// Trust cached tables when present
    pub use_cache: ConfigValue<bool>,
    /// Language used for localized text lookups
    pub language: ConfigValue<Language>,
    /// Abort setup if loading takes longer than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_timeout_secs: Option<u64>,
    /// Retry policy for remote fetches
    pub fetch: RetryPolicy,
    /// Known desired version per table; older caches are refetched
    pub versions: HashMap<String, i64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    endpoint: Option<String>,
    cache_dir: Option<PathBuf>,
    use_cache: Option<bool>,
    language: Option<Language>,
    setup_timeout_secs: Option<u64>,
    fetch: Option<RetryPolicy>,
    versions: Option<HashMap<String, i64>>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut endpoint = ConfigValue::new(None, ConfigSource::Default);
        let mut cache_dir = ConfigValue::new(Self::default_cache_dir(), ConfigSource::Default);
        let mut use_cache = ConfigValue::new(true, ConfigSource::Default);
        let mut language = ConfigValue::new(Language::default(), ConfigSource::Default);
        let mut setup_timeout_secs = None;
        let mut fetch = RetryPolicy::default();
        let mut versions = HashMap::new();
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.endpoint {
                endpoint = ConfigValue::new(Some(url), ConfigSource::File);
            }
            if let Some(dir) = file_config.cache_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                cache_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(enabled) = file_config.use_cache {
                use_cache = ConfigValue::new(enabled, ConfigSource::File);
            }
            if let Some(lang) = file_config.language {
                language = ConfigValue::new(lang, ConfigSource::File);
            }
            setup_timeout_secs = file_config.setup_timeout_secs;
            if let Some(policy) = file_config.fetch {
                fetch = policy;
            }
            if let Some(map) = file_config.versions {
                versions = map;
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("MASTERDATA_ENDPOINT") {
            endpoint = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("MASTERDATA_CACHE_DIR") {
            cache_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("MASTERDATA_USE_CACHE") {
            let enabled = parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidEnv("MASTERDATA_USE_CACHE", value.clone()))?;
            use_cache = ConfigValue::new(enabled, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("MASTERDATA_LANGUAGE") {
            let lang = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("MASTERDATA_LANGUAGE", value.clone()))?;
            language = ConfigValue::new(lang, ConfigSource::Environment);
        }

        Ok(Self {
            endpoint,
            cache_dir,
            use_cache,
            language,
            setup_timeout_secs,
            fetch,
            versions,
            config_file,
        })
    }

    pub fn setup_timeout(&self) -> Option<Duration> {
        self.setup_timeout_secs.map(Duration::from_secs)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/masterdata/
    /// - macOS: ~/Library/Application Support/masterdata/
    /// - Windows: %APPDATA%/masterdata/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("masterdata")
    }

    /// Default cache directory: platform data dir + masterdata/MasterData
    pub fn default_cache_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("masterdata")
            .join("MasterData")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(var, value) => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
