//! Guard configuration

use crate::attempts::{DEFAULT_MAX_ATTEMPTS, MAX_ATTEMPTS_LIMIT, MIN_ATTEMPTS_LIMIT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Argon2id cost parameters used for the unlock PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Parallel lanes
    pub parallelism: u32,
}

impl KdfParams {
    /// Create explicit parameters
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for KdfParams {
    /// 16 MiB, 2 iterations, 2 lanes
    fn default() -> Self {
        Self::new(16384, 2, 2)
    }
}

/// Configuration for a [`crate::SafetyGuard`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Failed-attempt threshold used until the user picks one
    pub default_max_attempts: u32,
    /// PIN hashing cost
    pub pin_kdf: KdfParams,
    /// Window in which three taps count as a quick-exit gesture
    pub tap_window_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            pin_kdf: KdfParams::default(),
            tap_window_ms: 600,
        }
    }
}

impl GuardConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is inside its allowed range
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ATTEMPTS_LIMIT..=MAX_ATTEMPTS_LIMIT).contains(&self.default_max_attempts) {
            return Err(Error::Validation(format!(
                "default_max_attempts must be between {} and {}",
                MIN_ATTEMPTS_LIMIT, MAX_ATTEMPTS_LIMIT
            )));
        }
        if self.pin_kdf.iterations == 0 || self.pin_kdf.parallelism == 0 {
            return Err(Error::Validation(
                "pin_kdf iterations and parallelism must be non-zero".to_string(),
            ));
        }
        if self.pin_kdf.memory_kib < 8 * self.pin_kdf.parallelism {
            return Err(Error::Validation(
                "pin_kdf memory_kib must be at least 8 * parallelism".to_string(),
            ));
        }
        if self.tap_window_ms == 0 {
            return Err(Error::Validation("tap_window_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}
