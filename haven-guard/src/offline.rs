//! Offline gate
//!
//! A single global switch. When it is on, network-originating work is never
//! started and callers get cached data instead.

use crate::data::CacheStore;
use crate::settings::{SettingFlag, SettingsStore};
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Intercepts outbound operations while offline mode is on
#[derive(Clone)]
pub struct OfflineGate {
    settings: SettingsStore,
    cache: Arc<dyn CacheStore>,
}

impl OfflineGate {
    /// Create a gate
    pub fn new(settings: SettingsStore, cache: Arc<dyn CacheStore>) -> Self {
        Self { settings, cache }
    }

    /// Whether offline mode is on
    ///
    /// An unreadable flag counts as on: failing here must not open the network.
    pub fn is_enabled(&self) -> bool {
        self.settings
            .flag(SettingFlag::OfflineMode)
            .unwrap_or_else(|e| {
                error!("Offline flag unreadable, staying offline: {}", e);
                true
            })
    }

    /// Turn offline mode on or off
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.settings.set_flag(SettingFlag::OfflineMode, enabled)
    }

    /// Run `operation` unless offline, in which case return `cached_fallback`
    pub fn guard<T>(&self, operation: impl FnOnce() -> T, cached_fallback: T) -> T {
        if self.is_enabled() {
            debug!("Offline mode: operation skipped");
            return cached_fallback;
        }
        operation()
    }

    /// Async form of [`OfflineGate::guard`]; the future isn't created when offline
    pub async fn guard_async<T, F, Fut>(&self, operation: F, cached_fallback: T) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.is_enabled() {
            debug!("Offline mode: async operation skipped");
            return cached_fallback;
        }
        operation().await
    }

    /// Fetch through the gate: network when online, cache when offline
    ///
    /// Returns `Ok(None)` when offline and nothing is cached.
    pub fn fetch<F>(&self, key: &str, operation: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if self.is_enabled() {
            return Ok(self.cached(key));
        }
        operation().map(Some)
    }

    /// Cached value for `key`
    pub fn cached(&self, key: &str) -> Option<Vec<u8>> {
        if self.cache.has_cached(key) {
            self.cache.get_cached(key)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryCache;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gate() -> (Arc<MemoryStorage>, Arc<MemoryCache>, OfflineGate) {
        let storage = Arc::new(MemoryStorage::new());
        let cache = Arc::new(MemoryCache::new());
        let gate = OfflineGate::new(SettingsStore::new(storage.clone()), cache.clone());
        (storage, cache, gate)
    }

    #[test]
    fn test_online_runs_operation() {
        let (_, _, gate) = gate();
        assert!(!gate.is_enabled());
        assert_eq!(gate.guard(|| "network", "cache"), "network");
    }

    #[test]
    fn test_offline_never_dispatches() {
        let (_, cache, gate) = gate();
        cache.put("programs", b"cached".to_vec());
        gate.set_enabled(true).unwrap();

        let calls = AtomicUsize::new(0);
        let result = gate
            .fetch("programs", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(b"fresh".to_vec())
            })
            .unwrap();

        assert_eq!(result, Some(b"cached".to_vec()));
        assert_eq!(gate.fetch("missing", || Ok(vec![1])).unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unreadable_flag_stays_offline() {
        let (storage, _, gate) = gate();
        storage.set_available(false);
        assert!(gate.is_enabled());
        assert_eq!(gate.guard(|| 1, 2), 2);
    }

    #[tokio::test]
    async fn test_guard_async_skips_future() {
        let (_, _, gate) = gate();
        gate.set_enabled(true).unwrap();
        let calls = AtomicUsize::new(0);
        let value = gate
            .guard_async(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "network"
                },
                "cache",
            )
            .await;
        assert_eq!(value, "cache");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
