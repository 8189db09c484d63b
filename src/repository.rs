//! Master data repository.
//!
//! [`MasterData`] owns every table. [`MasterData::setup`] loads all tables
//! concurrently (one task per table), then runs the construction pass and
//! publishes the result. Lookups are synchronous and return `None` until the
//! repository is ready; once ready it stays ready for the life of the
//! instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::construct::{self, ConstructError, MasterTables, RawTables};
use crate::fetcher::RemoteFetcher;
use crate::loader::{LoadError, TableLoader, TableSource};
use crate::models::{
    Card, CardRow, Chapter, ChapterRow, Effect, EventRow, GameEvent, Item, ItemRow, Quest,
    QuestRow, TextRow,
};
use crate::storage::TableCache;
use crate::table::{Language, Table};

/// Per-table outcome of a setup run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: Table,
    pub source: TableSource,
    pub version: i64,
    pub rows: usize,
}

/// Outcome of a successful setup, one entry per table in [`Table::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetupReport {
    pub tables: Vec<TableReport>,
}

impl SetupReport {
    pub fn get(&self, table: Table) -> Option<&TableReport> {
        self.tables.iter().find(|r| r.table == table)
    }

    /// Number of tables downloaded from the remote during this run.
    pub fn fetched(&self) -> usize {
        self.tables
            .iter()
            .filter(|r| r.source == TableSource::Remote)
            .count()
    }
}

/// Rows of one loaded table, tagged with their destination.
enum TableRows {
    JpText(Vec<TextRow>),
    EnText(Vec<TextRow>),
    Cards(Vec<CardRow>),
    Chapters(Vec<ChapterRow>),
    Quests(Vec<QuestRow>),
    Events(Vec<EventRow>),
    Items(Vec<ItemRow>),
    Effects(Vec<Effect>),
}

impl TableRows {
    fn store(self, raw: &mut RawTables) {
        match self {
            TableRows::JpText(rows) => raw.jp_text = rows,
            TableRows::EnText(rows) => raw.en_text = rows,
            TableRows::Cards(rows) => raw.cards = rows,
            TableRows::Chapters(rows) => raw.chapters = rows,
            TableRows::Quests(rows) => raw.quests = rows,
            TableRows::Events(rows) => raw.events = rows,
            TableRows::Items(rows) => raw.items = rows,
            TableRows::Effects(rows) => raw.effects = rows,
        }
    }
}

type LoadTask = Result<(TableReport, TableRows), LoadError>;

/// Clears the in-flight flag when a setup run ends, however it ends.
struct SetupGuard<'a>(&'a AtomicBool);

impl Drop for SetupGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of all master data tables and their composite entities.
pub struct MasterData {
    cache: Arc<dyn TableCache>,
    fetcher: Arc<dyn RemoteFetcher>,
    desired_versions: HashMap<String, i64>,
    language: Language,
    setup_timeout: Option<Duration>,
    tables: OnceLock<MasterTables>,
    ready: watch::Sender<bool>,
    setup_running: AtomicBool,
}

impl MasterData {
    pub fn new(cache: Arc<dyn TableCache>, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            cache,
            fetcher,
            desired_versions: HashMap::new(),
            language: Language::default(),
            setup_timeout: None,
            tables: OnceLock::new(),
            ready,
            setup_running: AtomicBool::new(false),
        }
    }

    /// Fails setup with [`MasterDataError::Timeout`] if loading takes longer than `limit`.
    pub fn with_setup_timeout(mut self, limit: Duration) -> Self {
        self.setup_timeout = Some(limit);
        self
    }

    /// Known desired version per table name; see [`TableLoader::with_desired_versions`].
    pub fn with_desired_versions(mut self, versions: HashMap<String, i64>) -> Self {
        self.desired_versions = versions;
        self
    }

    /// Selects which text table backs [`MasterData::localized_text`].
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Loads every table and builds the composite entities.
    pub async fn setup(&self, use_cache: bool) -> Result<SetupReport, MasterDataError> {
        self.setup_with(use_cache, |_| {}).await
    }

    /// Like [`MasterData::setup`], calling `on_complete` once the data is ready.
    pub async fn setup_with<F>(
        &self,
        use_cache: bool,
        on_complete: F,
    ) -> Result<SetupReport, MasterDataError>
    where
        F: FnOnce(&SetupReport),
    {
        if self.is_ready() {
            return Err(MasterDataError::AlreadyLoaded);
        }
        if self
            .setup_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MasterDataError::SetupInProgress);
        }
        let _guard = SetupGuard(&self.setup_running);

        tracing::info!("MasterData load start (use_cache: {})", use_cache);

        let loader = TableLoader::new(self.cache.clone(), self.fetcher.clone(), use_cache)
            .with_desired_versions(self.desired_versions.clone());

        let (raw, report) = match self.setup_timeout {
            Some(limit) => tokio::time::timeout(limit, load_all(loader))
                .await
                .map_err(|_| MasterDataError::Timeout(limit))??,
            None => load_all(loader).await?,
        };

        let tables = construct::build(raw, self.language)?;
        if self.tables.set(tables).is_err() {
            return Err(MasterDataError::AlreadyLoaded);
        }
        self.ready.send_replace(true);

        tracing::info!(
            "MasterData load done ({} of {} tables fetched)",
            report.fetched(),
            report.tables.len()
        );
        on_complete(&report);

        Ok(report)
    }

    /// Returns true once setup has completed.
    pub fn is_ready(&self) -> bool {
        self.tables.get().is_some()
    }

    /// Resolves once setup has completed.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        while !*rx.borrow_and_update() {
            // The sender lives in `self`, so this only fails if `self` is gone
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn data(&self) -> Option<&MasterTables> {
        self.tables.get()
    }

    pub fn localized_text(&self, key: &str) -> Option<&str> {
        self.data()?.texts.get(key).map(|t| t.text.as_str())
    }

    pub fn card(&self, id: i32) -> Option<&Card> {
        self.data()?.cards.get(&id)
    }

    pub fn item(&self, id: i32) -> Option<&Item> {
        self.data()?.items.get(&id)
    }

    pub fn chapter(&self, id: i32) -> Option<&Chapter> {
        self.data()?.chapters.get(&id)
    }

    pub fn quest(&self, id: i32) -> Option<&Quest> {
        self.data()?.quests.get(&id)
    }

    pub fn event(&self, id: i32) -> Option<&GameEvent> {
        self.data()?.events.get(&id)
    }

    /// All chapters in table order. Empty before setup.
    pub fn chapters(&self) -> &[Chapter] {
        self.data()
            .map(|d| d.chapter_list.as_slice())
            .unwrap_or_default()
    }

    /// All quests in table order. Empty before setup.
    pub fn quests(&self) -> &[Quest] {
        self.data()
            .map(|d| d.quest_list.as_slice())
            .unwrap_or_default()
    }

    /// All events in table order. Empty before setup.
    pub fn events(&self) -> &[GameEvent] {
        self.data()
            .map(|d| d.event_list.as_slice())
            .unwrap_or_default()
    }

    /// Indexed text keys, sorted.
    pub fn text_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .data()
            .map(|d| d.texts.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }
}

/// Loads every table concurrently. The first failure aborts the remaining loads.
async fn load_all(loader: TableLoader) -> Result<(RawTables, SetupReport), MasterDataError> {
    let mut set: JoinSet<LoadTask> = JoinSet::new();

    for table in Table::ALL {
        match table {
            Table::JpText => spawn_load(&mut set, &loader, table, TableRows::JpText),
            Table::EnText => spawn_load(&mut set, &loader, table, TableRows::EnText),
            Table::Card => spawn_load(&mut set, &loader, table, TableRows::Cards),
            Table::Chapter => spawn_load(&mut set, &loader, table, TableRows::Chapters),
            Table::Quest => spawn_load(&mut set, &loader, table, TableRows::Quests),
            Table::Event => spawn_load(&mut set, &loader, table, TableRows::Events),
            Table::Item => spawn_load(&mut set, &loader, table, TableRows::Items),
            Table::Effect => spawn_load(&mut set, &loader, table, TableRows::Effects),
        }
    }

    let mut raw = RawTables::default();
    let mut reports = Vec::with_capacity(Table::ALL.len());

    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok(Ok((report, rows))) => {
                rows.store(&mut raw);
                reports.push(report);
                continue;
            }
            Ok(Err(e)) => MasterDataError::Load(e),
            Err(e) => MasterDataError::Task(e.to_string()),
        };

        tracing::error!("MasterData load failed: {}", failure);
        set.abort_all();
        while set.join_next().await.is_some() {}
        return Err(failure);
    }

    reports.sort_by_key(|r| r.table);
    Ok((raw, SetupReport { tables: reports }))
}

fn spawn_load<T, F>(set: &mut JoinSet<LoadTask>, loader: &TableLoader, table: Table, wrap: F)
where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(Vec<T>) -> TableRows + Send + 'static,
{
    let loader = loader.clone();
    set.spawn(async move {
        let loaded = loader.load::<T>(table).await?;
        let report = TableReport {
            table: loaded.table,
            source: loaded.source,
            version: loaded.envelope.version,
            rows: loaded.envelope.data.len(),
        };
        Ok::<_, LoadError>((report, wrap(loaded.envelope.data)))
    });
}

/// Errors that fail a setup run. The repository stays not-ready after any of them.
#[derive(Debug)]
pub enum MasterDataError {
    /// Setup already completed for this instance.
    AlreadyLoaded,
    /// Another setup call is still running.
    SetupInProgress,
    /// Loading did not finish within the configured limit.
    Timeout(Duration),
    /// A table failed to load.
    Load(LoadError),
    /// A load task panicked or was cancelled.
    Task(String),
    /// The construction pass rejected the loaded data.
    Construct(ConstructError),
}

impl std::fmt::Display for MasterDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterDataError::AlreadyLoaded => write!(f, "Master data is already loaded"),
            MasterDataError::SetupInProgress => write!(f, "Master data setup already in progress"),
            MasterDataError::Timeout(limit) => {
                write!(f, "Master data setup timed out after {:?}", limit)
            }
            MasterDataError::Load(e) => write!(f, "{}", e),
            MasterDataError::Task(e) => write!(f, "Load task failed: {}", e),
            MasterDataError::Construct(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MasterDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MasterDataError::Load(e) => Some(e),
            MasterDataError::Construct(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadError> for MasterDataError {
    fn from(e: LoadError) -> Self {
        MasterDataError::Load(e)
    }
}

impl From<ConstructError> for MasterDataError {
    fn from(e: ConstructError) -> Self {
        MasterDataError::Construct(e)
    }
}
