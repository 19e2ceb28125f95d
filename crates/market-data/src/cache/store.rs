//! In-memory entry store.
//!
//! Maps a [`CacheKey`] to the last successfully produced value and the time
//! it was captured. The store makes no freshness judgement; that belongs to
//! the coordinator.
//!
//! There is no eviction beyond overwrite-on-refresh, so the store grows with
//! the number of distinct keys for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::warn;

use crate::models::CacheKey;

/// A stored value and its capture time.
///
/// Entries are immutable; a refresh replaces the whole entry.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: Arc<V>,
    captured_at: Instant,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            captured_at: self.captured_at,
        }
    }
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, captured_at: Instant) -> Self {
        Self {
            value: Arc::new(value),
            captured_at,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn shared_value(&self) -> Arc<V> {
        Arc::clone(&self.value)
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Age of the entry at `now`. Zero if `now` precedes the capture time.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.captured_at)
    }
}

/// Thread-safe key -> entry map guarded by a single lock.
pub struct EntryStore<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V> EntryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Acquire the read lock, recovering from poison if necessary.
    ///
    /// Entries are replaced whole under the write lock, so a poisoned map
    /// still only holds complete entries.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Entry store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Entry store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up the entry for `key`, fresh or not.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.read().get(key).cloned()
    }

    /// Insert or overwrite the entry for `key`.
    pub fn put(&self, key: CacheKey, value: V, captured_at: Instant) {
        self.insert(key, CacheEntry::new(value, captured_at));
    }

    /// Insert a prepared entry, replacing any previous one for `key`.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry<V>) {
        self.write().insert(key, entry);
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.write().remove(key)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.read().keys().cloned().collect()
    }
}

impl<V> Default for EntryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
