//! Safety guard facade
//!
//! One explicitly constructed guard per installed app instance. It owns the
//! storage handle and every component built on it; nothing here is global.
//!
//! PIN verification, attempt recording and credential mutation all run under
//! a single auth lock so a rapid double submit can't lose a failed attempt.

use crate::attempts::{AttemptState, AttemptTracker, FailureOutcome};
use crate::biometric::{BiometricAuthenticator, BiometricGate, BiometricKind, BiometricResult};
use crate::config::GuardConfig;
use crate::credential::{CredentialInfo, CredentialStore, Pin};
use crate::data::{CacheStore, DataStores};
use crate::events::{EventBus, GuardEvent};
use crate::offline::OfflineGate;
use crate::policy::{validate_pin, PinValidation};
use crate::quick_exit::QuickExitController;
use crate::settings::{
    QuickExitDestination, SafetySettings, SettingFlag, SettingsStore, TrustedNetworkStore,
};
use crate::shake::ShakeToClearController;
use crate::shell::NavigationShell;
use crate::storage::SecureStorage;
use crate::triggers::{route_trigger, ExitTrigger, TapDetector, TriggerAction};
use crate::wipe::PanicWipeExecutor;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Result of an unlock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Credential accepted, counter reset
    Unlocked,
    /// Credential rejected
    Rejected {
        /// Attempts left, only while panic wipe is armed
        remaining_attempts: Option<u32>,
    },
    /// Threshold reached: all local data was destroyed
    Wiped,
}

impl UnlockOutcome {
    /// Whether access was granted
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

/// External collaborators handed to the guard
pub struct GuardDeps {
    /// Durable secret storage
    pub storage: Arc<dyn SecureStorage>,
    /// Profile, favorites, history
    pub data: DataStores,
    /// Offline cache
    pub cache: Arc<dyn CacheStore>,
    /// OS biometric API
    pub biometric: Arc<dyn BiometricAuthenticator>,
    /// Host UI shell
    pub shell: Arc<dyn NavigationShell>,
}

/// Safety & privacy guard
pub struct SafetyGuard {
    credentials: CredentialStore,
    attempts: AttemptTracker,
    settings: SettingsStore,
    trusted: TrustedNetworkStore,
    biometric: BiometricGate,
    wipe: PanicWipeExecutor,
    quick_exit: QuickExitController,
    shake: ShakeToClearController,
    offline: OfflineGate,
    events: EventBus,
    taps: Mutex<TapDetector>,
    auth_lock: Mutex<()>,
    unlocked: AtomicBool,
}

impl SafetyGuard {
    /// Build a guard from its configuration and collaborators
    pub fn new(config: GuardConfig, deps: GuardDeps) -> Result<Self> {
        config.validate()?;
        let GuardDeps {
            storage,
            data,
            cache,
            biometric,
            shell,
        } = deps;

        let settings = SettingsStore::new(storage.clone());
        let attempts = AttemptTracker::new(storage.clone(), config.default_max_attempts);
        Ok(Self {
            credentials: CredentialStore::new(storage.clone(), &config.pin_kdf)?,
            trusted: TrustedNetworkStore::new(storage.clone()),
            biometric: BiometricGate::new(biometric),
            quick_exit: QuickExitController::new(shell.clone(), settings.clone()),
            shake: ShakeToClearController::new(shell, data.history.clone()),
            offline: OfflineGate::new(settings.clone(), cache),
            wipe: PanicWipeExecutor::new(storage, attempts.clone(), data),
            attempts,
            settings,
            events: EventBus::new(),
            taps: Mutex::new(TapDetector::new(Duration::from_millis(config.tap_window_ms))),
            auth_lock: Mutex::new(()),
            unlocked: AtomicBool::new(false),
        })
    }

    // ---------------------------------------------------------------------
    // PIN lifecycle
    // ---------------------------------------------------------------------

    /// Check a candidate PIN against the strength policy
    pub fn validate_pin(pin: &str) -> PinValidation {
        validate_pin(pin)
    }

    /// Whether a PIN exists
    pub fn has_pin(&self) -> Result<bool> {
        self.credentials.has_credential()
    }

    /// Non-secret facts about the PIN
    pub fn credential_info(&self) -> Result<Option<CredentialInfo>> {
        self.credentials.credential_info()
    }

    /// First-time PIN setup; leaves the session unlocked
    pub fn set_pin(&self, pin: impl Into<Pin>) -> Result<()> {
        let pin = pin.into();
        let _auth = self.auth_lock.lock();
        if self.credentials.has_credential()? {
            return Err(Error::CredentialExists);
        }
        self.credentials.set_credential(&pin)?;
        self.attempts.record_success()?;
        self.unlocked.store(true, Ordering::SeqCst);
        self.events.emit(GuardEvent::CredentialChanged);
        Ok(())
    }

    /// Replace the PIN after verifying the current one
    ///
    /// The new PIN is checked against the policy first, so a weak choice never
    /// costs an attempt.
    pub fn change_pin(
        &self,
        current: impl Into<Pin>,
        new: impl Into<Pin>,
    ) -> Result<UnlockOutcome> {
        let (current, new) = (current.into(), new.into());
        if let Some(reason) = validate_pin(new.expose()).reason {
            return Err(Error::Policy(reason));
        }

        let _auth = self.auth_lock.lock();
        let outcome = self.verify_locked(&current)?;
        if outcome.is_unlocked() {
            self.credentials.set_credential(&new)?;
            self.events.emit(GuardEvent::CredentialChanged);
            info!("PIN changed");
        }
        Ok(outcome)
    }

    /// Remove the PIN after verifying it; biometric unlock goes with it
    pub fn remove_pin(&self, current: impl Into<Pin>) -> Result<UnlockOutcome> {
        let current = current.into();
        let _auth = self.auth_lock.lock();
        let outcome = self.verify_locked(&current)?;
        if outcome.is_unlocked() {
            self.settings.set_flag(SettingFlag::Biometric, false)?;
            self.attempts.set_panic_wipe_enabled(false)?;
            self.credentials.remove_credential()?;
            self.events.emit(GuardEvent::CredentialChanged);
        }
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Unlock
    // ---------------------------------------------------------------------

    /// Try to unlock with a PIN
    ///
    /// Storage errors are returned as errors and never grant access. A wipe
    /// left pending by an earlier failure runs again before the PIN is looked
    /// at.
    pub fn unlock(&self, pin: impl Into<Pin>) -> Result<UnlockOutcome> {
        let pin = pin.into();
        let _auth = self.auth_lock.lock();
        self.verify_locked(&pin)
    }

    // Caller holds `auth_lock`.
    fn verify_locked(&self, pin: &Pin) -> Result<UnlockOutcome> {
        if !self.credentials.has_credential()? {
            return Err(Error::NoCredential);
        }
        if self.attempts.load()?.wipe_pending() {
            warn!("Unfinished panic wipe found, running it again");
            self.run_wipe()?;
            return Ok(UnlockOutcome::Wiped);
        }

        if self.credentials.verify_credential(pin)? {
            self.attempts.record_success()?;
            self.unlocked.store(true, Ordering::SeqCst);
            self.events.emit(GuardEvent::Unlocked);
            return Ok(UnlockOutcome::Unlocked);
        }
        self.record_failure_locked()
    }

    // Caller holds `auth_lock`. Shared by the PIN and biometric paths.
    fn record_failure_locked(&self) -> Result<UnlockOutcome> {
        self.unlocked.store(false, Ordering::SeqCst);
        match self.attempts.record_failure()? {
            FailureOutcome::Recorded { remaining, .. } => {
                self.events.emit(GuardEvent::UnlockFailed { remaining });
                Ok(UnlockOutcome::Rejected {
                    remaining_attempts: remaining,
                })
            }
            FailureOutcome::WipeRequired => {
                self.run_wipe()?;
                Ok(UnlockOutcome::Wiped)
            }
        }
    }

    /// Try to unlock with biometrics
    ///
    /// Only available once a PIN exists and biometric unlock is enabled. A
    /// rejected biometric counts as a failed attempt, same as a wrong PIN; a
    /// cancelled prompt isn't counted.
    pub fn unlock_with_biometric(&self, reason: &str) -> Result<UnlockOutcome> {
        if !self.credentials.has_credential()? {
            return Err(Error::NoCredential);
        }
        if !self.settings.flag(SettingFlag::Biometric)? {
            return Err(Error::BiometricUnavailable);
        }

        match self.biometric.authenticate(reason) {
            BiometricResult::Success => {
                let _auth = self.auth_lock.lock();
                // The PIN may have been removed while the prompt was up.
                if !self.credentials.has_credential()? {
                    return Err(Error::NoCredential);
                }
                if self.attempts.load()?.wipe_pending() {
                    self.run_wipe()?;
                    return Ok(UnlockOutcome::Wiped);
                }
                self.attempts.record_success()?;
                self.unlocked.store(true, Ordering::SeqCst);
                self.events.emit(GuardEvent::Unlocked);
                Ok(UnlockOutcome::Unlocked)
            }
            BiometricResult::Failed => {
                let _auth = self.auth_lock.lock();
                if !self.credentials.has_credential()? {
                    return Err(Error::NoCredential);
                }
                self.record_failure_locked()
            }
            BiometricResult::Cancelled => Ok(UnlockOutcome::Rejected {
                remaining_attempts: self.remaining_attempts()?,
            }),
            BiometricResult::NotAvailable => Err(Error::BiometricUnavailable),
            BiometricResult::Error(e) => Err(e),
        }
    }

    /// Whether the session is unlocked
    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Relock the session
    pub fn lock(&self) {
        if self.unlocked.swap(false, Ordering::SeqCst) {
            self.events.emit(GuardEvent::Locked);
        }
    }

    // ---------------------------------------------------------------------
    // Attempts & panic wipe
    // ---------------------------------------------------------------------

    /// Current attempt counters
    pub fn attempt_state(&self) -> Result<AttemptState> {
        self.attempts.load()
    }

    /// Attempts left before a wipe, only while panic wipe is armed
    pub fn remaining_attempts(&self) -> Result<Option<u32>> {
        let state = self.attempts.load()?;
        Ok(state.panic_wipe_enabled.then(|| state.remaining()))
    }

    /// Set the failed-attempt threshold (1..=10)
    pub fn set_max_attempts(&self, max_attempts: u32) -> Result<()> {
        let _auth = self.auth_lock.lock();
        self.attempts.set_max_attempts(max_attempts)
    }

    /// Arm or disarm panic wipe; arming requires a PIN
    pub fn set_panic_wipe_enabled(&self, enabled: bool) -> Result<()> {
        let _auth = self.auth_lock.lock();
        if enabled && !self.credentials.has_credential()? {
            return Err(Error::NoCredential);
        }
        self.attempts.set_panic_wipe_enabled(enabled)?;
        info!("Panic wipe {}", if enabled { "armed" } else { "disarmed" });
        Ok(())
    }

    /// Destroy all local data now
    ///
    /// Fails with [`Error::Storage`] if the PIN credential couldn't be
    /// removed; the wipe then stays pending and reruns on the next unlock.
    pub fn panic_wipe(&self) -> Result<()> {
        let _auth = self.auth_lock.lock();
        self.run_wipe()
    }

    /// Explicit "clear all data" from settings; same sequence as a panic wipe
    pub fn clear_all_data(&self) -> Result<()> {
        self.panic_wipe()
    }

    // Caller holds `auth_lock`.
    fn run_wipe(&self) -> Result<()> {
        self.unlocked.store(false, Ordering::SeqCst);
        self.taps.lock().reset();
        self.wipe.execute()?;
        if self.credentials.has_credential()? {
            return Err(Error::Storage("PIN credential still present after wipe".to_string()));
        }
        self.events.emit(GuardEvent::PanicWipeCompleted);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    /// Every flag
    pub fn settings(&self) -> Result<SafetySettings> {
        self.settings.snapshot()
    }

    /// Handle to the settings store
    pub fn settings_store(&self) -> SettingsStore {
        self.settings.clone()
    }

    /// Change a flag
    ///
    /// Enabling biometric unlock requires an existing PIN and a sensor.
    pub fn set_flag(&self, flag: SettingFlag, enabled: bool) -> Result<()> {
        if flag == SettingFlag::Biometric && enabled {
            if !self.credentials.has_credential()? {
                return Err(Error::NoCredential);
            }
            if self.biometric.is_available() == BiometricKind::None {
                return Err(Error::BiometricUnavailable);
            }
        }
        self.settings.set_flag(flag, enabled)?;
        self.events.emit(GuardEvent::SettingsChanged { flag, enabled });
        Ok(())
    }

    /// Biometric sensor on this device
    pub fn biometric_kind(&self) -> BiometricKind {
        self.biometric.is_available()
    }

    /// Selected quick-exit destination
    pub fn quick_exit_destination(&self) -> QuickExitDestination {
        self.quick_exit.destination()
    }

    /// Select a quick-exit destination
    pub fn set_quick_exit_destination(&self, destination: QuickExitDestination) -> Result<()> {
        self.settings.set_quick_exit_destination(destination)
    }

    // ---------------------------------------------------------------------
    // Quick exit, shake to clear, triggers
    // ---------------------------------------------------------------------

    /// Quick exit: relock, clear visible state, navigate away
    pub fn quick_exit(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
        self.taps.lock().reset();
        self.quick_exit.execute();
        self.events.emit(GuardEvent::QuickExitExecuted);
    }

    /// Clear browsing history without confirmation (explicit user action)
    pub fn clear_history(&self) -> Result<()> {
        self.shake.execute()?;
        self.events.emit(GuardEvent::HistoryCleared);
        Ok(())
    }

    /// Route and run an exit trigger
    ///
    /// An unreadable settings store falls back to defaults so the exit
    /// surfaces keep working.
    pub fn on_trigger(&self, trigger: ExitTrigger) -> Result<TriggerAction> {
        let settings = self.settings.snapshot().unwrap_or_else(|e| {
            warn!("Settings unreadable while routing trigger: {}", e);
            SafetySettings::default()
        });

        let action = route_trigger(trigger, &settings);
        match action {
            TriggerAction::QuickExit => self.quick_exit(),
            TriggerAction::RequestShakeClear => {
                if self.shake.request_clear()? {
                    self.events.emit(GuardEvent::HistoryCleared);
                }
            }
            TriggerAction::Ignore => {}
        }
        Ok(action)
    }

    /// Feed a screen tap; the third tap inside the window triggers quick exit
    pub fn register_tap(&self) -> Result<TriggerAction> {
        self.register_tap_at(Instant::now())
    }

    /// [`SafetyGuard::register_tap`] with an explicit timestamp
    pub fn register_tap_at(&self, at: Instant) -> Result<TriggerAction> {
        let completed = self.taps.lock().register_tap(at);
        if completed {
            self.on_trigger(ExitTrigger::TripleTap)
        } else {
            Ok(TriggerAction::Ignore)
        }
    }

    // ---------------------------------------------------------------------
    // Networks & offline
    // ---------------------------------------------------------------------

    /// Handle to the trusted-network set
    pub fn trusted_networks(&self) -> TrustedNetworkStore {
        self.trusted.clone()
    }

    /// Mark a Wi-Fi network as trusted
    pub fn trust_network(&self, ssid: &str) -> Result<()> {
        if self.trusted.trust(ssid)? {
            self.events.emit(GuardEvent::NetworkTrusted);
        }
        Ok(())
    }

    /// Stop trusting a Wi-Fi network
    pub fn untrust_network(&self, ssid: &str) -> Result<()> {
        if self.trusted.untrust(ssid)? {
            self.events.emit(GuardEvent::NetworkUntrusted);
        }
        Ok(())
    }

    /// Offline gate
    pub fn offline_gate(&self) -> &OfflineGate {
        &self.offline
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.events.subscribe()
    }
}
