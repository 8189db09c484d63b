//! Immutable keyed index with duplicate detection.
//!
//! An [`IndexedTable`] is built once from a list of records and a key
//! extraction function. Records without a key are skipped. When two records
//! map to the same key the first one is kept and the later one is dropped
//! with a warning.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct IndexedTable<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> IndexedTable<K, V>
where
    K: Eq + Hash + Display,
{
    /// Builds an index from `records`, keyed by `key_of`.
    pub fn build<I, F>(records: I, key_of: F) -> Self
    where
        I: IntoIterator<Item = V>,
        F: Fn(&V) -> Option<K>,
    {
        let mut entries = HashMap::new();
        for record in records {
            let Some(key) = key_of(&record) else {
                continue;
            };

            if entries.contains_key(&key) {
                tracing::warn!("duplicate key: {}", key);
                continue;
            }

            entries.insert(key, record);
        }

        Self { entries }
    }

    /// Looks up a record by key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Iterates over records in arbitrary order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

impl<K, V> Default for IndexedTable<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}
