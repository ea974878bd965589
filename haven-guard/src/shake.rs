//! Shake to clear history
//!
//! Unlike quick exit, an accidental shake must never destroy anything without
//! the user saying yes, and only history is touched.

use crate::data::DataStore;
use crate::shell::{ConfirmationRequest, NavigationShell};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Clears history after confirmation
#[derive(Clone)]
pub struct ShakeToClearController {
    shell: Arc<dyn NavigationShell>,
    history: Arc<dyn DataStore>,
}

impl ShakeToClearController {
    /// Create a controller
    pub fn new(shell: Arc<dyn NavigationShell>, history: Arc<dyn DataStore>) -> Self {
        Self { shell, history }
    }

    /// Ask for confirmation, then clear; returns whether history was cleared
    pub fn request_clear(&self) -> Result<bool> {
        if !self.shell.confirm(ConfirmationRequest::ClearHistory) {
            info!("Shake-to-clear declined");
            return Ok(false);
        }
        self.execute()?;
        Ok(true)
    }

    /// Clear history; callers must have obtained confirmation
    pub fn execute(&self) -> Result<()> {
        self.history.delete_all()?;
        info!("History cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryDataStore;
    use crate::shell::{RecordingShell, ShellCall};

    #[test]
    fn test_declined_keeps_history() {
        let shell = Arc::new(RecordingShell::new());
        shell.set_confirm_answer(false);
        let history = Arc::new(MemoryDataStore::new("history"));
        history.insert("search:shelter");

        let controller = ShakeToClearController::new(shell.clone(), history.clone());
        assert!(!controller.request_clear().unwrap());
        assert_eq!(history.len(), 1);
        assert_eq!(
            shell.calls(),
            vec![ShellCall::Confirm(ConfirmationRequest::ClearHistory)]
        );
    }

    #[test]
    fn test_confirmed_clears_history_only() {
        let shell = Arc::new(RecordingShell::new());
        let history = Arc::new(MemoryDataStore::new("history"));
        history.insert("search:shelter");

        let controller = ShakeToClearController::new(shell.clone(), history.clone());
        assert!(controller.request_clear().unwrap());
        assert!(history.is_empty().unwrap());
        assert!(!shell
            .calls()
            .iter()
            .any(|c| matches!(c, ShellCall::Navigate(_))));
    }
}
