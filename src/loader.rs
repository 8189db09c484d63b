//! Per-table load: decide between the local cache and a remote fetch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fetcher::{FetchError, RemoteFetcher};
use crate::storage::{StorageError, TableCache};
use crate::table::{Table, TableEnvelope};

/// Where a loaded table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSource {
    Cache,
    Remote,
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::Cache => write!(f, "cache"),
            TableSource::Remote => write!(f, "remote"),
        }
    }
}

/// Result of loading one table.
#[derive(Debug, Clone)]
pub struct LoadedTable<T> {
    pub table: Table,
    pub source: TableSource,
    pub envelope: TableEnvelope<T>,
}

/// Loads tables, fetching from the remote only when the cache can't be used.
#[derive(Clone)]
pub struct TableLoader {
    cache: Arc<dyn TableCache>,
    fetcher: Arc<dyn RemoteFetcher>,
    use_cache: bool,
    desired_versions: Arc<HashMap<String, i64>>,
}

impl TableLoader {
    pub fn new(cache: Arc<dyn TableCache>, fetcher: Arc<dyn RemoteFetcher>, use_cache: bool) -> Self {
        Self {
            cache,
            fetcher,
            use_cache,
            desired_versions: Arc::new(HashMap::new()),
        }
    }

    /// Sets the known desired version per table name. A cached table older
    /// than its desired version is refetched; tables absent from the map
    /// trust their cache.
    pub fn with_desired_versions(mut self, versions: HashMap<String, i64>) -> Self {
        self.desired_versions = Arc::new(versions);
        self
    }

    /// Loads `table`, refreshing the cache from the remote when required.
    pub async fn load<T>(&self, table: Table) -> Result<LoadedTable<T>, LoadError>
    where
        T: DeserializeOwned,
    {
        let cached = self.read_cached::<T>(table);

        let cached = match cached {
            Some(envelope) if self.use_cache && !self.is_outdated(table, envelope.version) => {
                tracing::info!("Local file used: {} (version {})", table, envelope.version);
                return Ok(LoadedTable {
                    table,
                    source: TableSource::Cache,
                    envelope,
                });
            }
            other => other,
        };

        let body = self
            .fetcher
            .fetch(table)
            .await
            .map_err(LoadError::Fetch)?;

        let envelope: TableEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| LoadError::Parse(table, e.to_string()))?;

        if let Some(old) = &cached {
            if envelope.version < old.version {
                tracing::warn!(
                    "{} version went backwards: remote {} < local {}",
                    table,
                    envelope.version,
                    old.version
                );
            }
        }

        self.cache.write(table, &body).map_err(LoadError::Storage)?;
        tracing::info!("Network download: {} (version {})", table, envelope.version);

        Ok(LoadedTable {
            table,
            source: TableSource::Remote,
            envelope,
        })
    }

    /// Reads and parses the cached envelope. Unreadable or corrupt caches count as absent.
    fn read_cached<T>(&self, table: Table) -> Option<TableEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let contents = match self.cache.read(table) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read cached {}: {}", table, e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!("Discarding corrupt cache for {}: {}", table, e);
                None
            }
        }
    }

    fn is_outdated(&self, table: Table, cached_version: i64) -> bool {
        match self.desired_versions.get(table.name()) {
            Some(&desired) => {
                tracing::debug!("Server: {} > Local: {} ({})", desired, cached_version, table);
                desired > cached_version
            }
            None => false,
        }
    }
}

/// Errors that abort a single table load.
#[derive(Debug)]
pub enum LoadError {
    /// Remote fetch failed.
    Fetch(FetchError),
    /// Fetched body is not a valid envelope for the table.
    Parse(Table, String),
    /// Fetched data could not be written to the cache.
    Storage(StorageError),
}

impl LoadError {
    pub fn table(&self) -> Option<Table> {
        match self {
            LoadError::Fetch(FetchError::HttpError(t, _) | FetchError::Status(t, _)) => Some(*t),
            LoadError::Parse(t, _) => Some(*t),
            LoadError::Storage(_) => None,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Fetch(e) => write!(f, "Fetch error: {}", e),
            LoadError::Parse(table, e) => write!(f, "Failed to parse {}: {}", table, e),
            LoadError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(e) => Some(e),
            LoadError::Parse(_, _) => None,
            LoadError::Storage(e) => Some(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::CardRow;
    use crate::storage::FileCache;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory fetcher serving canned bodies and counting calls per table.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        bodies: Mutex<HashMap<Table, String>>,
        calls: Mutex<HashMap<Table, usize>>,
    }

    impl FakeFetcher {
        pub(crate) fn with(self, table: Table, body: impl Into<String>) -> Self {
            self.insert(table, body);
            self
        }

        pub(crate) fn insert(&self, table: Table, body: impl Into<String>) {
            self.bodies.lock().unwrap().insert(table, body.into());
        }

        pub(crate) fn calls(&self, table: Table) -> usize {
            self.calls.lock().unwrap().get(&table).copied().unwrap_or(0)
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl RemoteFetcher for FakeFetcher {
        async fn fetch(&self, table: Table) -> Result<String, FetchError> {
            *self.calls.lock().unwrap().entry(table).or_insert(0) += 1;
            self.bodies
                .lock()
                .unwrap()
                .get(&table)
                .cloned()
                .ok_or(FetchError::Status(table, 404))
        }
    }

    const CARDS_V1: &str = r#"{"version":1,"data":[{"id":1,"name":"local"}]}"#;
    const CARDS_V2: &str = r#"{"version":2,"data":[{"id":1,"name":"remote"}]}"#;

    fn setup(fetcher: FakeFetcher) -> (Arc<FileCache>, Arc<FakeFetcher>, TempDir) {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(FileCache::new(temp.path().to_path_buf()));
        (cache, Arc::new(fetcher), temp)
    }

    #[tokio::test]
    async fn test_missing_cache_fetches_and_persists() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(loaded.envelope.version, 2);
        assert_eq!(fetcher.calls(Table::Card), 1);
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V2));
    }

    #[tokio::test]
    async fn test_valid_cache_skips_fetch() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, CARDS_V1).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Cache);
        assert_eq!(loaded.envelope.data[0].name, "local");
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_fetches() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, CARDS_V1).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), false);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(fetcher.calls(Table::Card), 1);
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V2));
    }

    #[tokio::test]
    async fn test_newer_desired_version_refetches() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, CARDS_V1).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true)
            .with_desired_versions(HashMap::from([("Card".to_string(), 2)]));

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(loaded.envelope.version, 2);
    }

    #[tokio::test]
    async fn test_equal_desired_version_uses_cache() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, CARDS_V1).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true)
            .with_desired_versions(HashMap::from([("Card".to_string(), 1)]));

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Cache);
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_treated_as_absent() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, "{not json").unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V2));
    }

    #[tokio::test]
    async fn test_unreadable_cache_treated_as_absent() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        std::fs::write(cache.path(Table::Card), [0xff, 0xfe, 0x00]).unwrap();
        assert!(cache.read(Table::Card).is_err());
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), true);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(fetcher.calls(Table::Card), 1);
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V2));
    }

    #[tokio::test]
    async fn test_older_remote_version_still_replaces_cache() {
        const CARDS_V5: &str = r#"{"version":5,"data":[{"id":1,"name":"newer"}]}"#;
        let (cache, fetcher, _temp) = setup(FakeFetcher::default().with(Table::Card, CARDS_V2));
        cache.write(Table::Card, CARDS_V5).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher.clone(), false);

        let loaded = loader.load::<CardRow>(Table::Card).await.unwrap();

        assert_eq!(loaded.source, TableSource::Remote);
        assert_eq!(loaded.envelope.version, 2);
        assert_eq!(loaded.envelope.data[0].name, "remote");
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V2));
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cache = Arc::new(FileCache::new(blocker.join("sub")));
        let fetcher = Arc::new(FakeFetcher::default().with(Table::Card, CARDS_V2));
        let loader = TableLoader::new(cache, fetcher.clone(), true);

        let err = loader.load::<CardRow>(Table::Card).await.unwrap_err();

        assert!(matches!(err, LoadError::Storage(_)));
        assert_eq!(err.table(), None);
        assert_eq!(fetcher.calls(Table::Card), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let (cache, fetcher, _temp) = setup(FakeFetcher::default());
        let loader = TableLoader::new(cache.clone(), fetcher, true);

        let err = loader.load::<CardRow>(Table::Card).await.unwrap_err();

        assert!(matches!(err, LoadError::Fetch(FetchError::Status(Table::Card, 404))));
        assert_eq!(err.table(), Some(Table::Card));
        assert!(!cache.exists(Table::Card));
    }

    #[tokio::test]
    async fn test_unparsable_fetch_is_fatal_and_not_cached() {
        let (cache, fetcher, _temp) =
            setup(FakeFetcher::default().with(Table::Card, "<html>oops</html>"));
        cache.write(Table::Card, CARDS_V1).unwrap();
        let loader = TableLoader::new(cache.clone(), fetcher, false);

        let err = loader.load::<CardRow>(Table::Card).await.unwrap_err();

        assert!(matches!(err, LoadError::Parse(Table::Card, _)));
        assert_eq!(cache.read(Table::Card).unwrap().as_deref(), Some(CARDS_V1));
    }
}
