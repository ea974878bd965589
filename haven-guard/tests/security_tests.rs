//! Security tests for PIN handling
//!
//! Covers the strength policy reason codes, the stored hash format,
//! verification timing and attempt counter properties.

use haven_guard::{
    validate_pin, AttemptState, CredentialStore, FailureOutcome, KdfParams, MemoryStorage, Pin,
    PinHasher, PinRejection, SecureStorage,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Strength policy
// ============================================================================

#[test]
fn test_policy_reason_codes() {
    let cases = [
        ("12345", Some(PinRejection::TooShort)),
        ("123456789", Some(PinRejection::TooLong)),
        ("12a456", Some(PinRejection::NotNumeric)),
        ("777777", Some(PinRejection::TooWeak)),
        ("345678", Some(PinRejection::TooWeak)),
        ("876543", Some(PinRejection::TooWeak)),
        ("890123", None),
        ("482917", None),
        ("48291735", None),
    ];

    for (pin, expected) in cases {
        let validation = validate_pin(pin);
        assert_eq!(validation.reason, expected, "pin {}", pin);
        assert_eq!(validation.valid, expected.is_none());
    }

    assert_eq!(PinRejection::TooWeak.to_string(), "too_weak");
}

// ============================================================================
// Hash storage
// ============================================================================

#[test]
fn test_hash_is_argon2id_phc() {
    let hasher = PinHasher::new(&KdfParams::new(1024, 1, 1)).unwrap();
    let hash = hasher.hash("482917").unwrap();

    assert!(hash.starts_with("$argon2id$"));
    assert!(!hash.contains("482917"));
    assert!(hasher.verify("482917", &hash).unwrap());
    assert!(!hasher.verify("482918", &hash).unwrap());
}

#[test]
fn test_plaintext_never_persisted() {
    let storage = Arc::new(MemoryStorage::new());
    let store = CredentialStore::new(storage.clone(), &KdfParams::new(1024, 1, 1)).unwrap();
    store.set_credential(&Pin::from("482917")).unwrap();

    let raw = storage
        .get(haven_guard::storage::keys::PIN_CREDENTIAL)
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(!text.contains("482917"));
    assert!(text.contains("$argon2id$"));
}

#[test]
fn test_pin_debug_redacted() {
    let pin = Pin::from("482917");
    assert!(!format!("{:?}", pin).contains("482917"));
}

// ============================================================================
// Timing
// ============================================================================

fn median_verify(store: &CredentialStore, pin: &str) -> Duration {
    let mut samples: Vec<Duration> = (0..7)
        .map(|_| {
            let start = Instant::now();
            let _ = store.verify_credential(&Pin::from(pin)).unwrap();
            start.elapsed()
        })
        .collect();
    samples.sort();
    samples[samples.len() / 2]
}

#[test]
fn test_verify_time_independent_of_input_shape() {
    let storage = Arc::new(MemoryStorage::new());
    let store = CredentialStore::new(storage, &KdfParams::new(4096, 1, 1)).unwrap();
    store.set_credential(&Pin::from("482917")).unwrap();

    let wrong_length = median_verify(&store, "12");
    let wrong_value = median_verify(&store, "482918");
    let correct = median_verify(&store, "482917");

    let times = [wrong_length, wrong_value, correct];
    let fastest = times.iter().min().unwrap().as_secs_f64();
    let slowest = times.iter().max().unwrap().as_secs_f64();
    assert!(
        slowest / fastest < 3.0,
        "verification timing diverged: {:?}",
        times
    );
}

#[test]
fn test_no_credential_still_derives() {
    let params = KdfParams::new(4096, 1, 1);
    let empty = CredentialStore::new(Arc::new(MemoryStorage::new()), &params).unwrap();
    let populated = CredentialStore::new(Arc::new(MemoryStorage::new()), &params).unwrap();
    populated.set_credential(&Pin::from("482917")).unwrap();

    // Warm the decoy hash.
    let _ = empty.verify_credential(&Pin::from("000000")).unwrap();

    let without = median_verify(&empty, "482917").as_secs_f64();
    let with = median_verify(&populated, "111111").as_secs_f64();
    assert!(without.max(with) / without.min(with) < 3.0);
}

// ============================================================================
// Attempt counter properties
// ============================================================================

proptest! {
    /// Property: the counter never exceeds the threshold
    #[test]
    fn prop_counter_saturates(
        max in 1u32..=10,
        failures in 0usize..40,
        armed in any::<bool>()
    ) {
        let mut state = AttemptState::new(max);
        state.panic_wipe_enabled = armed;
        for _ in 0..failures {
            state.record_failure();
        }
        prop_assert!(state.failed_count <= max);
    }

    /// Property: armed, the wipe fires on exactly the threshold-th failure
    #[test]
    fn prop_wipe_on_threshold(max in 1u32..=10) {
        let mut state = AttemptState::new(max);
        state.panic_wipe_enabled = true;

        for attempt in 1..=max {
            let outcome = state.record_failure();
            if attempt < max {
                prop_assert_eq!(
                    outcome,
                    FailureOutcome::Recorded {
                        failed_count: attempt,
                        remaining: Some(max - attempt),
                    }
                );
            } else {
                prop_assert_eq!(outcome, FailureOutcome::WipeRequired);
            }
        }
    }

    /// Property: disarmed, no number of failures requires a wipe
    #[test]
    fn prop_disarmed_never_wipes(max in 1u32..=10, failures in 0usize..40) {
        let mut state = AttemptState::new(max);
        for _ in 0..failures {
            let wiped = state.record_failure() == FailureOutcome::WipeRequired;
            prop_assert!(!wiped);
        }
    }

    /// Property: success always resets the counter
    #[test]
    fn prop_success_resets(max in 1u32..=10, failures in 0usize..20) {
        let mut state = AttemptState::new(max);
        for _ in 0..failures {
            state.record_failure();
        }
        state.record_success();
        prop_assert_eq!(state.failed_count, 0);
        prop_assert_eq!(state.remaining(), max);
    }
}
