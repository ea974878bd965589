//! Safety & privacy guard for the Haven directory app
//!
//! Gates access to the app behind a PIN (optionally aliased by biometrics),
//! destroys local data after too many failed unlocks, and provides the
//! quick-exit and shake-to-clear escape hatches.
//!
//! ## Security Features
//!
//! - **PIN Hashing**: Argon2id (16 MiB, 2 iterations, 2 lanes by default), never stored in plaintext
//! - **Strength Policy**: 6-8 digits, no repeated or sequential runs
//! - **Panic Wipe**: Irreversible deletion of every local store once the attempt threshold is hit
//! - **Biometric Unlock**: Convenience alias for an existing PIN, never an independent credential
//! - **Quick Exit**: Clears visible state, then navigates to a pre-approved neutral site
//! - **Offline Mode**: Single global switch that serves cached data only
//! - **Encrypted Storage**: ChaCha20-Poly1305 sealed blobs with hashed file names

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attempts;
pub mod biometric;
pub mod config;
pub mod copy;
pub mod credential;
pub mod data;
pub mod error;
pub mod events;
pub mod file_storage;
pub mod guard;
pub mod offline;
pub mod policy;
pub mod quick_exit;
pub mod security;
pub mod settings;
pub mod shake;
pub mod shell;
pub mod storage;
pub mod triggers;
pub mod wipe;

pub use attempts::{
    AttemptPhase, AttemptState, AttemptTracker, FailureOutcome, DEFAULT_MAX_ATTEMPTS,
    MAX_ATTEMPTS_LIMIT, MIN_ATTEMPTS_LIMIT,
};
pub use biometric::{
    BiometricAuthenticator, BiometricGate, BiometricKind, BiometricResult, MockBiometric,
};
pub use config::{GuardConfig, KdfParams};
pub use credential::{CredentialInfo, CredentialStore, Pin};
pub use data::{CacheStore, DataStore, DataStores, MemoryCache, MemoryDataStore};
pub use error::{Error, Result};
pub use events::{EventBus, GuardEvent};
pub use file_storage::EncryptedFileStorage;
pub use guard::{GuardDeps, SafetyGuard, UnlockOutcome};
pub use offline::OfflineGate;
pub use policy::{validate_pin, PinRejection, PinValidation, MAX_PIN_LENGTH, MIN_PIN_LENGTH};
pub use quick_exit::QuickExitController;
pub use security::{hash_sha256, MasterKey, PinHasher};
pub use settings::{
    QuickExitDestination, SafetySettings, SettingFlag, SettingsStore, TrustedNetworkStore,
};
pub use shake::ShakeToClearController;
pub use shell::{ConfirmationRequest, NavigationShell, RecordingShell, ShellCall};
pub use storage::{MemoryStorage, SecureStorage};
pub use triggers::{route_trigger, ExitTrigger, TapDetector, TriggerAction};
pub use wipe::PanicWipeExecutor;
