//! User-facing strings
//!
//! Messages never say whether a PIN was wrong in format or wrong in value.

use crate::guard::UnlockOutcome;
use crate::policy::{PinRejection, MAX_PIN_LENGTH, MIN_PIN_LENGTH};

/// Message for a PIN refused at setup
pub fn pin_rejection_message(reason: PinRejection) -> String {
    match reason {
        PinRejection::TooShort => format!("PIN must be at least {} digits.", MIN_PIN_LENGTH),
        PinRejection::TooLong => format!("PIN must be at most {} digits.", MAX_PIN_LENGTH),
        PinRejection::NotNumeric => "PIN must contain digits only.".to_string(),
        PinRejection::TooWeak => {
            "PIN is too easy to guess. Avoid repeated or sequential digits.".to_string()
        }
    }
}

/// Message after an unlock attempt
pub fn unlock_message(outcome: &UnlockOutcome) -> String {
    match outcome {
        UnlockOutcome::Unlocked => "Unlocked.".to_string(),
        UnlockOutcome::Rejected {
            remaining_attempts: None,
        } => "Incorrect PIN.".to_string(),
        UnlockOutcome::Rejected {
            remaining_attempts: Some(1),
        } => "Incorrect PIN. 1 attempt remaining before all data is erased.".to_string(),
        UnlockOutcome::Rejected {
            remaining_attempts: Some(n),
        } => format!(
            "Incorrect PIN. {} attempts remaining before all data is erased.",
            n
        ),
        UnlockOutcome::Wiped => {
            "Too many incorrect attempts. All local data has been erased.".to_string()
        }
    }
}
