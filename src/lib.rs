//! Master data sync library.
//!
//! Keeps a local cache of versioned master data tables in step with a remote
//! source, joins the raw tables into composite entities, and serves them
//! through keyed lookups once every table is loaded.

pub mod construct;
pub mod fetcher;
pub mod index;
pub mod loader;
pub mod models;
pub mod repository;
pub mod storage;
pub mod table;

pub use construct::ConstructError;
pub use fetcher::{FetchError, HttpFetcher, RemoteFetcher, RetryPolicy};
pub use index::IndexedTable;
pub use loader::{LoadError, LoadedTable, TableLoader, TableSource};
pub use models::{Card, Chapter, Effect, GameEvent, Item, LocalizedText, Quest};
pub use repository::{MasterData, MasterDataError, SetupReport, TableReport};
pub use storage::{FileCache, StorageError, TableCache};
pub use table::{Language, Table, TableEnvelope};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
