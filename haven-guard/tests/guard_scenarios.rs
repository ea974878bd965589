//! End-to-end scenarios for the safety guard
//!
//! Runs the guard over in-memory storage with scripted shell and biometric
//! collaborators.

use haven_guard::storage::keys;
use haven_guard::{
    BiometricKind, BiometricResult, DataStore, DataStores, Error, ExitTrigger, GuardConfig,
    GuardDeps, GuardEvent, KdfParams, MemoryCache, MemoryDataStore, MemoryStorage, MockBiometric,
    QuickExitDestination, RecordingShell, SafetyGuard, SecureStorage, SettingFlag, ShellCall,
    TriggerAction, UnlockOutcome,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PIN: &str = "482917";
const WRONG: &str = "999999";

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    storage: Arc<MemoryStorage>,
    profile: Arc<MemoryDataStore>,
    favorites: Arc<MemoryDataStore>,
    history: Arc<MemoryDataStore>,
    cache: Arc<MemoryCache>,
    shell: Arc<RecordingShell>,
    biometric: Arc<MockBiometric>,
    guard: SafetyGuard,
}

fn fast_config() -> GuardConfig {
    GuardConfig {
        pin_kdf: KdfParams::new(1024, 1, 1),
        ..Default::default()
    }
}

fn fixture_with(biometric: MockBiometric) -> Fixture {
    let storage = Arc::new(MemoryStorage::new());
    let profile = Arc::new(MemoryDataStore::new("profile"));
    let favorites = Arc::new(MemoryDataStore::new("favorites"));
    let history = Arc::new(MemoryDataStore::new("history"));
    let cache = Arc::new(MemoryCache::new());
    let shell = Arc::new(RecordingShell::new());
    let biometric = Arc::new(biometric);

    let guard = SafetyGuard::new(
        fast_config(),
        GuardDeps {
            storage: storage.clone(),
            data: DataStores {
                profile: profile.clone(),
                favorites: favorites.clone(),
                history: history.clone(),
            },
            cache: cache.clone(),
            biometric: biometric.clone(),
            shell: shell.clone(),
        },
    )
    .unwrap();

    Fixture {
        storage,
        profile,
        favorites,
        history,
        cache,
        shell,
        biometric,
        guard,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockBiometric::new(BiometricKind::Fingerprint))
}

fn wipe_events(events: &mut tokio::sync::broadcast::Receiver<GuardEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = events.try_recv() {
        if event == GuardEvent::PanicWipeCompleted {
            count += 1;
        }
    }
    count
}

/// Secure storage that refuses to delete the PIN credential
struct StuckCredential(MemoryStorage);

impl SecureStorage for StuckCredential {
    fn get(&self, key: &str) -> haven_guard::Result<Option<Vec<u8>>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> haven_guard::Result<()> {
        self.0.set(key, value)
    }

    fn delete(&self, key: &str) -> haven_guard::Result<()> {
        if key == keys::PIN_CREDENTIAL {
            return Err(Error::Storage("keystore locked".to_string()));
        }
        self.0.delete(key)
    }

    fn clear(&self) -> haven_guard::Result<()> {
        Err(Error::Storage("keystore locked".to_string()))
    }
}

// ============================================================================
// PIN lifecycle
// ============================================================================

#[test]
fn test_wrong_attempts_then_correct_resets_counter() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard.lock();

    for wrong in ["111111", "999999"] {
        assert_eq!(
            f.guard.unlock(wrong).unwrap(),
            UnlockOutcome::Rejected {
                remaining_attempts: None
            }
        );
    }
    assert_eq!(f.guard.attempt_state().unwrap().failed_count, 2);

    assert_eq!(f.guard.unlock(PIN).unwrap(), UnlockOutcome::Unlocked);
    assert_eq!(f.guard.attempt_state().unwrap().failed_count, 0);
    assert!(f.guard.is_unlocked());
}

#[test]
fn test_set_pin_twice_rejected() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    assert!(matches!(f.guard.set_pin("735194"), Err(Error::CredentialExists)));
}

#[test]
fn test_weak_pin_rejected_at_setup() {
    let f = fixture();
    assert!(matches!(f.guard.set_pin("123456"), Err(Error::Policy(_))));
    assert!(!f.guard.has_pin().unwrap());
}

#[test]
fn test_unlock_without_pin() {
    let f = fixture();
    assert!(matches!(f.guard.unlock(PIN), Err(Error::NoCredential)));
}

#[test]
fn test_change_pin() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();

    // Weak new PIN is refused before the current one is checked.
    assert!(matches!(f.guard.change_pin(WRONG, "222222"), Err(Error::Policy(_))));
    assert_eq!(f.guard.attempt_state().unwrap().failed_count, 0);

    assert!(matches!(
        f.guard.change_pin(WRONG, "735194").unwrap(),
        UnlockOutcome::Rejected { .. }
    ));
    assert_eq!(f.guard.change_pin(PIN, "735194").unwrap(), UnlockOutcome::Unlocked);

    f.guard.lock();
    assert!(!f.guard.unlock(PIN).unwrap().is_unlocked());
    assert!(f.guard.unlock("735194").unwrap().is_unlocked());
}

#[test]
fn test_remove_pin_disables_biometric() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_flag(SettingFlag::Biometric, true).unwrap();

    assert_eq!(f.guard.remove_pin(PIN).unwrap(), UnlockOutcome::Unlocked);
    assert!(!f.guard.has_pin().unwrap());
    assert!(!f.guard.settings().unwrap().biometric_enabled);
}

// ============================================================================
// Panic wipe
// ============================================================================

#[test]
fn test_threshold_wipes_everything() {
    let f = fixture();
    f.favorites.insert("Legal aid clinic");
    f.history.insert("search: shelters");
    f.profile.insert("onboarding");
    f.guard.set_pin(PIN).unwrap();
    f.guard.trust_network("HomeWiFi").unwrap();
    f.guard.set_max_attempts(3).unwrap();
    f.guard.set_panic_wipe_enabled(true).unwrap();
    f.guard.lock();

    let mut events = f.guard.subscribe();

    assert_eq!(
        f.guard.unlock(WRONG).unwrap(),
        UnlockOutcome::Rejected {
            remaining_attempts: Some(2)
        }
    );
    assert_eq!(
        f.guard.unlock(WRONG).unwrap(),
        UnlockOutcome::Rejected {
            remaining_attempts: Some(1)
        }
    );
    assert_eq!(f.guard.unlock(WRONG).unwrap(), UnlockOutcome::Wiped);

    assert!(!f.guard.has_pin().unwrap());
    assert!(f.favorites.is_empty().unwrap());
    assert!(f.history.is_empty().unwrap());
    assert!(f.profile.is_empty().unwrap());
    assert!(f.guard.trusted_networks().list().unwrap().is_empty());
    assert!(f.storage.is_empty());
    assert!(!f.guard.is_unlocked());

    assert_eq!(wipe_events(&mut events), 1);
}

#[test]
fn test_wipe_stays_pending_while_credential_survives() {
    let storage = Arc::new(StuckCredential(MemoryStorage::new()));
    let favorites = Arc::new(MemoryDataStore::new("favorites"));
    favorites.insert("Legal aid clinic");
    let guard = SafetyGuard::new(
        fast_config(),
        GuardDeps {
            storage: storage.clone(),
            data: DataStores {
                profile: Arc::new(MemoryDataStore::new("profile")),
                favorites: favorites.clone(),
                history: Arc::new(MemoryDataStore::new("history")),
            },
            cache: Arc::new(MemoryCache::new()),
            biometric: Arc::new(MockBiometric::new(BiometricKind::Fingerprint)),
            shell: Arc::new(RecordingShell::new()),
        },
    )
    .unwrap();
    guard.set_pin(PIN).unwrap();
    guard.set_max_attempts(3).unwrap();
    guard.set_panic_wipe_enabled(true).unwrap();
    guard.lock();
    let mut events = guard.subscribe();

    guard.unlock(WRONG).unwrap();
    guard.unlock(WRONG).unwrap();
    assert!(matches!(guard.unlock(WRONG), Err(Error::Storage(_))));

    // Everything else is gone, but the stale credential keeps the wipe armed.
    assert!(favorites.is_empty().unwrap());
    assert!(guard.has_pin().unwrap());
    let state = guard.attempt_state().unwrap();
    assert!(state.panic_wipe_enabled);
    assert_eq!(state.failed_count, state.max_attempts);

    // Every later attempt, even the right PIN, retries the wipe.
    for pin in [WRONG, PIN] {
        assert!(matches!(guard.unlock(pin), Err(Error::Storage(_))));
        assert!(!guard.is_unlocked());
    }
    assert!(matches!(guard.panic_wipe(), Err(Error::Storage(_))));
    assert_eq!(wipe_events(&mut events), 0);

    // With the credential finally gone, unlock falls back to onboarding.
    storage.0.delete(keys::PIN_CREDENTIAL).unwrap();
    assert!(matches!(guard.unlock(PIN), Err(Error::NoCredential)));
}

#[test]
fn test_wipe_continues_past_failing_store() {
    let f = fixture();
    f.favorites.insert("saved");
    f.history.insert("visited");
    f.favorites.set_fail_deletes(true);
    f.guard.set_pin(PIN).unwrap();

    f.guard.panic_wipe().unwrap();

    assert!(!f.guard.has_pin().unwrap());
    assert_eq!(f.favorites.len(), 1);
    assert!(f.history.is_empty().unwrap());
}

#[test]
fn test_disarmed_never_wipes() {
    let f = fixture();
    f.favorites.insert("saved");
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_max_attempts(1).unwrap();

    for _ in 0..5 {
        assert_eq!(
            f.guard.unlock(WRONG).unwrap(),
            UnlockOutcome::Rejected {
                remaining_attempts: None
            }
        );
    }
    assert!(f.guard.has_pin().unwrap());
    assert_eq!(f.favorites.len(), 1);
    assert!(f.guard.unlock(PIN).unwrap().is_unlocked());
}

#[test]
fn test_arming_requires_pin() {
    let f = fixture();
    assert!(matches!(
        f.guard.set_panic_wipe_enabled(true),
        Err(Error::NoCredential)
    ));
}

#[test]
fn test_max_attempts_range() {
    let f = fixture();
    assert!(f.guard.set_max_attempts(0).is_err());
    assert!(f.guard.set_max_attempts(11).is_err());
    f.guard.set_max_attempts(10).unwrap();
    assert_eq!(f.guard.attempt_state().unwrap().max_attempts, 10);
}

#[test]
fn test_concurrent_submits_all_counted() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_max_attempts(10).unwrap();
    let guard = Arc::new(f.guard);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let guard = guard.clone();
            thread::spawn(move || guard.unlock(WRONG).unwrap())
        })
        .collect();
    for handle in handles {
        assert!(!handle.join().unwrap().is_unlocked());
    }

    assert_eq!(guard.attempt_state().unwrap().failed_count, 4);
}

#[test]
fn test_concurrent_submits_wipe_once() {
    let f = fixture();
    f.favorites.insert("saved");
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_max_attempts(3).unwrap();
    f.guard.set_panic_wipe_enabled(true).unwrap();
    f.guard.lock();
    let mut events = f.guard.subscribe();
    let guard = Arc::new(f.guard);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let guard = guard.clone();
            thread::spawn(move || guard.unlock(WRONG))
        })
        .collect();

    let mut wiped = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(UnlockOutcome::Wiped) => wiped += 1,
            Ok(UnlockOutcome::Rejected { .. }) | Err(Error::NoCredential) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert_eq!(wiped, 1);
    assert_eq!(wipe_events(&mut events), 1);
    assert!(!guard.has_pin().unwrap());
    assert!(f.favorites.is_empty().unwrap());
}

// ============================================================================
// Fail closed
// ============================================================================

#[test]
fn test_storage_failure_fails_closed() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard.lock();

    f.storage.set_available(false);
    assert!(matches!(f.guard.unlock(PIN), Err(Error::Storage(_))));
    assert!(!f.guard.is_unlocked());

    f.storage.set_available(true);
    assert!(f.guard.unlock(PIN).unwrap().is_unlocked());
}

// ============================================================================
// Biometric
// ============================================================================

#[test]
fn test_biometric_requires_pin_and_flag() {
    let f = fixture();
    assert!(matches!(
        f.guard.set_flag(SettingFlag::Biometric, true),
        Err(Error::NoCredential)
    ));

    f.guard.set_pin(PIN).unwrap();
    f.guard.lock();
    assert!(matches!(
        f.guard.unlock_with_biometric("Unlock Haven"),
        Err(Error::BiometricUnavailable)
    ));

    f.guard.set_flag(SettingFlag::Biometric, true).unwrap();
    assert_eq!(
        f.guard.unlock_with_biometric("Unlock Haven").unwrap(),
        UnlockOutcome::Unlocked
    );
    assert_eq!(f.biometric.prompts(), vec!["Unlock Haven".to_string()]);
}

#[test]
fn test_biometric_failure_counted_cancel_not() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_flag(SettingFlag::Biometric, true).unwrap();
    f.guard.lock();

    f.biometric.push_result(BiometricResult::Cancelled);
    assert!(!f.guard.unlock_with_biometric("x").unwrap().is_unlocked());
    assert_eq!(f.guard.attempt_state().unwrap().failed_count, 0);

    f.biometric.push_result(BiometricResult::Failed);
    assert!(!f.guard.unlock_with_biometric("x").unwrap().is_unlocked());
    assert_eq!(f.guard.attempt_state().unwrap().failed_count, 1);
}

#[test]
fn test_biometric_failures_reach_wipe_threshold() {
    let f = fixture();
    f.history.insert("visited");
    f.guard.set_pin(PIN).unwrap();
    f.guard.set_flag(SettingFlag::Biometric, true).unwrap();
    f.guard.set_max_attempts(2).unwrap();
    f.guard.set_panic_wipe_enabled(true).unwrap();
    f.guard.lock();

    assert!(!f.guard.unlock(WRONG).unwrap().is_unlocked());
    f.biometric.push_result(BiometricResult::Failed);
    assert_eq!(f.guard.unlock_with_biometric("x").unwrap(), UnlockOutcome::Wiped);
    assert!(!f.guard.has_pin().unwrap());
    assert!(f.history.is_empty().unwrap());
}

#[test]
fn test_no_sensor_cannot_enable_biometric() {
    let f = fixture_with(MockBiometric::unavailable());
    f.guard.set_pin(PIN).unwrap();
    assert_eq!(f.guard.biometric_kind(), BiometricKind::None);
    assert!(matches!(
        f.guard.set_flag(SettingFlag::Biometric, true),
        Err(Error::BiometricUnavailable)
    ));
}

// ============================================================================
// Quick exit & shake
// ============================================================================

#[test]
fn test_quick_exit_survives_navigation_failure() {
    let f = fixture();
    f.guard.set_pin(PIN).unwrap();
    f.guard
        .set_quick_exit_destination(QuickExitDestination::Weather)
        .unwrap();
    f.shell.set_fail_navigation(true);

    f.guard.quick_exit();

    assert_eq!(
        f.shell.calls(),
        vec![
            ShellCall::ClearVisibleState,
            ShellCall::Navigate(QuickExitDestination::Weather.url().to_string()),
        ]
    );
    assert!(!f.guard.is_unlocked());
}

#[test]
fn test_shake_prefers_quick_exit() {
    let f = fixture();
    f.history.insert("visited");
    f.guard.set_flag(SettingFlag::ShakeToClear, true).unwrap();

    assert_eq!(
        f.guard.on_trigger(ExitTrigger::Shake).unwrap(),
        TriggerAction::QuickExit
    );
    assert_eq!(f.history.len(), 1);

    f.guard.set_flag(SettingFlag::QuickExit, false).unwrap();
    f.shell.set_confirm_answer(false);
    assert_eq!(
        f.guard.on_trigger(ExitTrigger::Shake).unwrap(),
        TriggerAction::RequestShakeClear
    );
    assert_eq!(f.history.len(), 1);

    f.shell.set_confirm_answer(true);
    f.guard.on_trigger(ExitTrigger::Shake).unwrap();
    assert!(f.history.is_empty().unwrap());
}

#[test]
fn test_triple_tap_triggers_quick_exit() {
    let f = fixture();
    let start = Instant::now();
    assert_eq!(f.guard.register_tap_at(start).unwrap(), TriggerAction::Ignore);
    assert_eq!(
        f.guard
            .register_tap_at(start + Duration::from_millis(150))
            .unwrap(),
        TriggerAction::Ignore
    );
    assert_eq!(
        f.guard
            .register_tap_at(start + Duration::from_millis(300))
            .unwrap(),
        TriggerAction::QuickExit
    );
    assert!(f
        .shell
        .calls()
        .iter()
        .any(|call| matches!(call, ShellCall::Navigate(_))));
}

// ============================================================================
// Offline
// ============================================================================

#[test]
fn test_offline_serves_cache_only() {
    let f = fixture();
    f.cache.put("programs/near-me", b"cached list".to_vec());
    f.guard.set_flag(SettingFlag::OfflineMode, true).unwrap();

    let mut dispatched = false;
    let result = f
        .guard
        .offline_gate()
        .fetch("programs/near-me", || {
            dispatched = true;
            Ok(b"fresh".to_vec())
        })
        .unwrap();

    assert!(!dispatched);
    assert_eq!(result, Some(b"cached list".to_vec()));
}
