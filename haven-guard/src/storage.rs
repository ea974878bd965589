//! Secure key/value storage seam
//!
//! Everything durable the guard owns (PIN hash, attempt counters, flags,
//! trusted networks) goes through [`SecureStorage`]. Platform builds back it
//! with hardware-protected storage; [`crate::EncryptedFileStorage`] and
//! [`MemoryStorage`] are the portable implementations.

use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroizing;

/// Storage keys owned by the guard
pub mod keys {
    /// PIN credential blob
    pub const PIN_CREDENTIAL: &str = "guard.pin_credential";
    /// Attempt tracker state
    pub const ATTEMPT_STATE: &str = "guard.attempt_state";
    /// Trusted Wi-Fi networks
    pub const TRUSTED_NETWORKS: &str = "guard.trusted_networks";
    /// Selected quick-exit destination
    pub const QUICK_EXIT_DESTINATION: &str = "settings.quick_exit_destination";
}

/// Opaque blob storage
pub trait SecureStorage: Send + Sync {
    /// Read a blob
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob, replacing any previous value
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a blob; deleting a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// Delete every blob
    fn clear(&self) -> Result<()>;
}

/// Read and decode a JSON value
pub fn get_json<T: DeserializeOwned>(storage: &dyn SecureStorage, key: &str) -> Result<Option<T>> {
    match storage.get(key)? {
        Some(bytes) => {
            let bytes = Zeroizing::new(bytes);
            Ok(Some(serde_json::from_slice(&bytes)?))
        }
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub fn put_json<T: Serialize>(storage: &dyn SecureStorage, key: &str, value: &T) -> Result<()> {
    let bytes = Zeroizing::new(serde_json::to_vec(value)?);
    storage.set(key, &bytes)
}

/// In-memory storage
///
/// Values are zeroized when overwritten or removed. `set_available(false)`
/// makes every call fail, which is how tests exercise fail-closed paths.
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
    available: AtomicBool,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn check(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Storage("secure storage unavailable".to_string()))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.entries.read().get(key).map(|v| v.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.check()?;
        self.entries
            .write()
            .insert(key.to_string(), Zeroizing::new(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check()?;
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: u32,
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get("a").unwrap().is_none());

        storage.set("a", b"1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some(b"1".as_slice()));

        storage.delete("a").unwrap();
        storage.delete("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_json_helpers() {
        let storage = MemoryStorage::new();
        put_json(&storage, "sample", &Sample { count: 3 }).unwrap();
        let loaded: Option<Sample> = get_json(&storage, "sample").unwrap();
        assert_eq!(loaded, Some(Sample { count: 3 }));
    }

    #[test]
    fn test_unavailable_storage_fails() {
        let storage = MemoryStorage::new();
        storage.set("a", b"1").unwrap();
        storage.set_available(false);

        assert!(matches!(storage.get("a"), Err(Error::Storage(_))));
        assert!(storage.set("b", b"2").is_err());
        assert!(storage.clear().is_err());

        storage.set_available(true);
        assert!(storage.get("a").unwrap().is_some());
    }
}
