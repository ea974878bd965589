//! Bulk data and cache collaborators
//!
//! Profile, favorites and history are owned by the rest of the app; the guard
//! only needs to delete them and to read the offline cache.

use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A store of user data the guard can erase
pub trait DataStore: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Delete every record
    fn delete_all(&self) -> Result<()>;

    /// Whether the store holds no records
    fn is_empty(&self) -> Result<bool>;
}

/// Previously fetched responses, keyed by request
pub trait CacheStore: Send + Sync {
    /// Whether a cached value exists
    fn has_cached(&self, key: &str) -> bool;

    /// Cached value, if any
    fn get_cached(&self, key: &str) -> Option<Vec<u8>>;
}

/// The user-data stores erased by a wipe, in wipe order
#[derive(Clone)]
pub struct DataStores {
    /// Onboarding profile
    pub profile: Arc<dyn DataStore>,
    /// Saved programs
    pub favorites: Arc<dyn DataStore>,
    /// Browsing history and recent activity
    pub history: Arc<dyn DataStore>,
}

impl DataStores {
    /// All stores in wipe order
    pub fn all(&self) -> [&Arc<dyn DataStore>; 3] {
        [&self.profile, &self.favorites, &self.history]
    }
}

/// In-memory [`DataStore`]
pub struct MemoryDataStore {
    name: String,
    records: RwLock<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryDataStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Add a record
    pub fn insert(&self, record: impl Into<String>) {
        self.records.write().push(record.into());
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Make `delete_all` fail, for exercising best-effort wipes
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl DataStore for MemoryDataStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_all(&self) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("{} is unavailable", self.name)));
        }
        self.records.write().clear();
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.records.read().is_empty())
    }
}

/// In-memory [`CacheStore`]
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), value.into());
    }
}

impl CacheStore for MemoryCache {
    fn has_cached(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get_cached(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }
}
