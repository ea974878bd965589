//! Failed-unlock attempt tracking
//!
//! [`AttemptState`] holds the pure transition logic; [`AttemptTracker`]
//! persists it. Callers serialize read-modify-write cycles (the guard holds its
//! auth lock around them) so concurrent submits can't under-count.

use crate::storage::{get_json, keys, put_json, SecureStorage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default failed-attempt threshold
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Lowest configurable threshold
pub const MIN_ATTEMPTS_LIMIT: u32 = 1;

/// Highest configurable threshold
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Coarse tracker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    /// No failures, or panic wipe not armed
    Normal,
    /// Panic wipe armed and at least one failure recorded
    Warning,
}

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Failure counted
    Recorded {
        /// Consecutive failures so far
        failed_count: u32,
        /// Attempts left before a wipe, only when panic wipe is armed
        remaining: Option<u32>,
    },
    /// Threshold reached with panic wipe armed
    WipeRequired,
}

/// Persisted attempt counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptState {
    /// Consecutive failed unlocks
    pub failed_count: u32,
    /// Threshold
    pub max_attempts: u32,
    /// Whether reaching the threshold destroys local data
    pub panic_wipe_enabled: bool,
}

impl AttemptState {
    /// Fresh state with the given threshold
    pub fn new(max_attempts: u32) -> Self {
        Self {
            failed_count: 0,
            max_attempts,
            panic_wipe_enabled: false,
        }
    }

    /// Attempts left before the threshold
    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.failed_count)
    }

    /// Current phase
    pub fn phase(&self) -> AttemptPhase {
        if self.panic_wipe_enabled && self.failed_count > 0 {
            AttemptPhase::Warning
        } else {
            AttemptPhase::Normal
        }
    }

    /// Count one failure
    ///
    /// The counter saturates at `max_attempts`. With panic wipe armed, the
    /// failure that reaches the threshold yields [`FailureOutcome::WipeRequired`].
    pub fn record_failure(&mut self) -> FailureOutcome {
        if self.failed_count < self.max_attempts {
            self.failed_count += 1;
        }

        if self.panic_wipe_enabled && self.failed_count >= self.max_attempts {
            return FailureOutcome::WipeRequired;
        }

        FailureOutcome::Recorded {
            failed_count: self.failed_count,
            remaining: self.panic_wipe_enabled.then(|| self.remaining()),
        }
    }

    /// Armed and at the threshold: the next unlock must wipe again
    pub fn wipe_pending(&self) -> bool {
        self.panic_wipe_enabled && self.failed_count >= self.max_attempts
    }

    /// Reset after a successful PIN or biometric unlock
    pub fn record_success(&mut self) {
        self.failed_count = 0;
    }
}

/// Persistent attempt tracker
#[derive(Clone)]
pub struct AttemptTracker {
    storage: Arc<dyn SecureStorage>,
    default_max_attempts: u32,
}

impl AttemptTracker {
    /// Create a tracker; `default_max_attempts` applies until the user sets one
    pub fn new(storage: Arc<dyn SecureStorage>, default_max_attempts: u32) -> Self {
        Self {
            storage,
            default_max_attempts,
        }
    }

    /// Load current state (created lazily on first use)
    pub fn load(&self) -> Result<AttemptState> {
        Ok(get_json(self.storage.as_ref(), keys::ATTEMPT_STATE)?
            .unwrap_or_else(|| AttemptState::new(self.default_max_attempts)))
    }

    fn save(&self, state: &AttemptState) -> Result<()> {
        put_json(self.storage.as_ref(), keys::ATTEMPT_STATE, state)
    }

    /// Record a failed unlock
    pub fn record_failure(&self) -> Result<FailureOutcome> {
        let mut state = self.load()?;
        let outcome = state.record_failure();
        self.save(&state)?;

        match outcome {
            FailureOutcome::WipeRequired => {
                warn!("Failed-attempt threshold reached with panic wipe armed")
            }
            FailureOutcome::Recorded { failed_count, .. } => {
                debug!("Failed unlock recorded ({}/{})", failed_count, state.max_attempts)
            }
        }
        Ok(outcome)
    }

    /// Record a successful unlock
    pub fn record_success(&self) -> Result<()> {
        let mut state = self.load()?;
        if state.failed_count != 0 {
            state.record_success();
            self.save(&state)?;
        }
        Ok(())
    }

    /// Change the threshold; resets the counter
    pub fn set_max_attempts(&self, max_attempts: u32) -> Result<()> {
        if !(MIN_ATTEMPTS_LIMIT..=MAX_ATTEMPTS_LIMIT).contains(&max_attempts) {
            return Err(Error::Validation(format!(
                "max attempts must be between {} and {}",
                MIN_ATTEMPTS_LIMIT, MAX_ATTEMPTS_LIMIT
            )));
        }
        let mut state = self.load()?;
        state.max_attempts = max_attempts;
        state.failed_count = 0;
        self.save(&state)
    }

    /// Arm or disarm panic wipe; resets the counter so arming never fires on
    /// failures made while it was off
    pub fn set_panic_wipe_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self.load()?;
        state.panic_wipe_enabled = enabled;
        state.failed_count = 0;
        self.save(&state)
    }

    /// Pin the state at the threshold with panic wipe armed
    ///
    /// Used when a wipe could not remove the PIN credential. Falls back to the
    /// default threshold if the current state can't be read.
    pub fn mark_wipe_pending(&self) -> Result<()> {
        let mut state = self
            .load()
            .unwrap_or_else(|_| AttemptState::new(self.default_max_attempts));
        state.panic_wipe_enabled = true;
        state.failed_count = state.max_attempts;
        self.save(&state)
    }

    /// Delete the persisted state
    pub fn clear(&self) -> Result<()> {
        self.storage.delete(keys::ATTEMPT_STATE)
    }
}
