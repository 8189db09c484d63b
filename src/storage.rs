//! Local table cache for persisting fetched envelopes to disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::table::Table;

/// Persistent store for serialized table envelopes.
///
/// `read` returns `Ok(None)` when nothing has been cached for the table.
/// Whether a cached envelope is current is the caller's decision.
pub trait TableCache: Send + Sync {
    fn read(&self, table: Table) -> Result<Option<String>, StorageError>;

    /// Persists `contents` for `table`. The data is durable once this returns.
    fn write(&self, table: Table, contents: &str) -> Result<(), StorageError>;
}

/// Stores one `{table}.json` file per table in a cache directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `cache_dir`. The directory is created on first write.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Returns the full path for a table.
    pub fn path(&self, table: Table) -> PathBuf {
        self.cache_dir.join(table.filename())
    }

    fn tmp_path(&self, table: Table) -> PathBuf {
        self.cache_dir.join(format!("{}.tmp", table.filename()))
    }

    pub fn exists(&self, table: Table) -> bool {
        self.path(table).exists()
    }

    /// Deletes the cached file for a table. Missing files are not an error.
    pub fn remove(&self, table: Table) -> Result<bool, StorageError> {
        let path = self.path(table);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Deletes every known table file and returns how many were removed.
    /// Leftover temp files from interrupted writes are swept too but not counted.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for table in Table::ALL {
            if self.remove(table)? {
                removed += 1;
            }
            let tmp_path = self.tmp_path(table);
            match fs::remove_file(&tmp_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::IoError(tmp_path, e)),
            }
        }
        Ok(removed)
    }
}

fn write_synced(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl TableCache for FileCache {
    fn read(&self, table: Table) -> Result<Option<String>, StorageError> {
        let path = self.path(table);

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    fn write(&self, table: Table, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| StorageError::IoError(self.cache_dir.clone(), e))?;

        let path = self.path(table);
        let tmp_path = self.tmp_path(table);

        // Write next to the target and rename so readers never see a partial file
        if let Err(e) = write_synced(&tmp_path, contents) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::IoError(tmp_path, e));
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::IoError(path, e));
        }

        tracing::debug!("Cached {} at {}", table, path.display());
        Ok(())
    }
}

/// Errors that can occur during cache storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
        }
    }
}
