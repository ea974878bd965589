//! Exit trigger routing
//!
//! Every quick-exit surface funnels into one action. A shake goes to quick exit
//! when that is enabled, and only falls through to shake-to-clear otherwise.

use crate::settings::SafetySettings;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Taps needed for the gesture
const TAPS_REQUIRED: usize = 3;

/// Where an exit request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    /// Dedicated button
    Button,
    /// App bar icon
    AppBarIcon,
    /// Floating action button
    FloatingButton,
    /// Three taps inside the tap window
    TripleTap,
    /// Device shake
    Shake,
}

/// What to do about a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Run quick exit now
    QuickExit,
    /// Ask to clear history
    RequestShakeClear,
    /// Feature disabled
    Ignore,
}

/// Decide the action for a trigger
pub fn route_trigger(trigger: ExitTrigger, settings: &SafetySettings) -> TriggerAction {
    match trigger {
        ExitTrigger::Shake if settings.quick_exit_enabled => TriggerAction::QuickExit,
        ExitTrigger::Shake if settings.shake_to_clear_enabled => TriggerAction::RequestShakeClear,
        ExitTrigger::Shake => TriggerAction::Ignore,
        _ if settings.quick_exit_enabled => TriggerAction::QuickExit,
        _ => TriggerAction::Ignore,
    }
}

/// Detects three taps within a window
#[derive(Debug)]
pub struct TapDetector {
    window: Duration,
    taps: VecDeque<Instant>,
}

impl TapDetector {
    /// Detector with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            taps: VecDeque::with_capacity(TAPS_REQUIRED),
        }
    }

    /// Record a tap; true when it completes the gesture
    pub fn register_tap(&mut self, at: Instant) -> bool {
        while let Some(&oldest) = self.taps.front() {
            if at.saturating_duration_since(oldest) > self.window {
                self.taps.pop_front();
            } else {
                break;
            }
        }
        self.taps.push_back(at);

        if self.taps.len() >= TAPS_REQUIRED {
            self.taps.clear();
            return true;
        }
        false
    }

    /// Forget pending taps
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
