//! PIN strength policy
//!
//! Runs at setup time only. Unlock-time verification never consults the policy,
//! so a rejected format can't be told apart from a wrong PIN.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum PIN length in digits
pub const MIN_PIN_LENGTH: usize = 6;

/// Maximum PIN length in digits
pub const MAX_PIN_LENGTH: usize = 8;

/// Why a PIN was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinRejection {
    /// Fewer than [`MIN_PIN_LENGTH`] digits
    TooShort,
    /// More than [`MAX_PIN_LENGTH`] digits
    TooLong,
    /// Contains something other than ASCII digits
    NotNumeric,
    /// All-identical digits or a strictly sequential run
    TooWeak,
}

impl fmt::Display for PinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::NotNumeric => "not_numeric",
            Self::TooWeak => "too_weak",
        };
        f.write_str(code)
    }
}

/// Structured validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinValidation {
    /// Whether the PIN may be stored
    pub valid: bool,
    /// Rejection reason when `valid` is false
    pub reason: Option<PinRejection>,
}

impl PinValidation {
    fn accepted() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: PinRejection) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Validate a candidate PIN
pub fn validate_pin(pin: &str) -> PinValidation {
    let len = pin.chars().count();
    if len < MIN_PIN_LENGTH {
        return PinValidation::rejected(PinRejection::TooShort);
    }
    if len > MAX_PIN_LENGTH {
        return PinValidation::rejected(PinRejection::TooLong);
    }
    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return PinValidation::rejected(PinRejection::NotNumeric);
    }

    let digits: Vec<i8> = pin.bytes().map(|b| (b - b'0') as i8).collect();
    if is_repeated(&digits) || is_sequential(&digits) {
        return PinValidation::rejected(PinRejection::TooWeak);
    }

    PinValidation::accepted()
}

fn is_repeated(digits: &[i8]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

// Steps of exactly +1 or exactly -1 across the whole PIN; no wrap-around.
fn is_sequential(digits: &[i8]) -> bool {
    let ascending = digits.windows(2).all(|w| w[1] - w[0] == 1);
    let descending = digits.windows(2).all(|w| w[0] - w[1] == 1);
    ascending || descending
}
