//! Panic wipe executor
//!
//! Deletes everything the app keeps locally. The PIN credential goes first and
//! is checked afterwards: if it can't be removed, the attempt tracker is left
//! armed at its threshold so the next unlock wipes again, and the wipe reports
//! an error instead of success. Every other step is attempted even when an
//! earlier one fails.

use crate::attempts::AttemptTracker;
use crate::data::DataStores;
use crate::settings::{SettingsStore, TrustedNetworkStore};
use crate::storage::{keys, SecureStorage};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Delete attempts made on the PIN credential before giving up
const CREDENTIAL_DELETE_ATTEMPTS: u32 = 3;

/// Irreversible local-data wipe
pub struct PanicWipeExecutor {
    storage: Arc<dyn SecureStorage>,
    attempts: AttemptTracker,
    settings: SettingsStore,
    trusted: TrustedNetworkStore,
    data: DataStores,
}

impl PanicWipeExecutor {
    /// Create an executor over the guard's storage and the app's data stores
    pub fn new(
        storage: Arc<dyn SecureStorage>,
        attempts: AttemptTracker,
        data: DataStores,
    ) -> Self {
        Self {
            settings: SettingsStore::new(storage.clone()),
            trusted: TrustedNetworkStore::new(storage.clone()),
            storage,
            attempts,
            data,
        }
    }

    /// Run the full wipe
    ///
    /// Order: PIN credential, attempt state, settings, trusted networks,
    /// profile, favorites, history, then a sweep of the secure storage.
    /// Failures are logged and the sequence continues. Returns an error only
    /// when the PIN credential survived; in that case the attempt state is
    /// pinned at the threshold rather than deleted and the sweep is skipped.
    pub fn execute(&self) -> Result<()> {
        warn!("Panic wipe started");
        let mut failures = 0usize;

        let credential_gone = self.delete_credential();
        if credential_gone {
            Self::step("attempt state", &mut failures, || self.attempts.clear());
        } else {
            Self::step("attempt state", &mut failures, || {
                self.attempts.mark_wipe_pending()
            });
        }
        Self::step("settings", &mut failures, || self.settings.clear());
        Self::step("trusted networks", &mut failures, || self.trusted.clear());
        for store in self.data.all() {
            Self::step(store.name(), &mut failures, || store.delete_all());
        }

        if !credential_gone {
            error!("Panic wipe could not remove the PIN credential; wipe stays pending");
            return Err(Error::Storage("PIN credential survived panic wipe".to_string()));
        }

        Self::step("secure storage sweep", &mut failures, || self.storage.clear());
        if failures == 0 {
            info!("Panic wipe complete");
        } else {
            error!("Panic wipe finished with {} failed step(s)", failures);
        }
        Ok(())
    }

    /// Delete the credential, retrying, and confirm it is gone
    fn delete_credential(&self) -> bool {
        for attempt in 1..=CREDENTIAL_DELETE_ATTEMPTS {
            if let Err(e) = self.storage.delete(keys::PIN_CREDENTIAL) {
                error!("PIN credential delete failed (try {}): {}", attempt, e);
            }
            match self.storage.get(keys::PIN_CREDENTIAL) {
                Ok(None) => return true,
                Ok(Some(_)) => {}
                Err(e) => error!("PIN credential check failed (try {}): {}", attempt, e),
            }
        }
        false
    }

    fn step(label: &str, failures: &mut usize, op: impl FnOnce() -> Result<()>) {
        if let Err(e) = op() {
            *failures += 1;
            error!("Panic wipe step '{}' failed: {}", label, e);
        }
    }
}
