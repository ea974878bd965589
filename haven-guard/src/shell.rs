//! Navigation/UI shell seam
//!
//! The guard never renders anything. It asks the shell to clear what's on
//! screen, to navigate away, or to show a confirmation dialog.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Confirmation dialogs the guard may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationRequest {
    /// Shake detected: clear browsing history?
    ClearHistory,
}

/// Host UI operations
pub trait NavigationShell: Send + Sync {
    /// Drop any sensitive state that is visible or cached in the UI layer
    fn clear_visible_state(&self);

    /// Leave the app for the given URL
    fn navigate_to(&self, url: &str) -> Result<()>;

    /// Ask the user to confirm; false when declined or dismissed
    fn confirm(&self, request: ConfirmationRequest) -> bool;
}

/// Shell call, as recorded by [`RecordingShell`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    /// `clear_visible_state`
    ClearVisibleState,
    /// `navigate_to` with the URL
    Navigate(String),
    /// `confirm` with the request
    Confirm(ConfirmationRequest),
}

/// Shell that records calls in order; used by tests and the harness
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
    fail_navigation: AtomicBool,
    confirm_answer: AtomicBool,
}

impl RecordingShell {
    /// Shell that navigates successfully and confirms every dialog
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_navigation: AtomicBool::new(false),
            confirm_answer: AtomicBool::new(true),
        }
    }

    /// Make `navigate_to` fail
    pub fn set_fail_navigation(&self, fail: bool) {
        self.fail_navigation.store(fail, Ordering::SeqCst);
    }

    /// Answer given to confirmation dialogs
    pub fn set_confirm_answer(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    /// Calls so far
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().clone()
    }
}

impl Default for RecordingShell {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationShell for RecordingShell {
    fn clear_visible_state(&self) {
        self.calls.lock().push(ShellCall::ClearVisibleState);
    }

    fn navigate_to(&self, url: &str) -> Result<()> {
        self.calls.lock().push(ShellCall::Navigate(url.to_string()));
        if self.fail_navigation.load(Ordering::SeqCst) {
            return Err(Error::Validation("navigation failed".to_string()));
        }
        Ok(())
    }

    fn confirm(&self, request: ConfirmationRequest) -> bool {
        self.calls.lock().push(ShellCall::Confirm(request));
        self.confirm_answer.load(Ordering::SeqCst)
    }
}
