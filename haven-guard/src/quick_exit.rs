//! Quick exit
//!
//! Self-defence path: no confirmation, sensitive state cleared before the
//! navigation is even attempted.

use crate::settings::{QuickExitDestination, SettingsStore};
use crate::shell::NavigationShell;
use std::sync::Arc;
use tracing::{error, info};

/// Clears visible state and leaves the app
#[derive(Clone)]
pub struct QuickExitController {
    shell: Arc<dyn NavigationShell>,
    settings: SettingsStore,
}

impl QuickExitController {
    /// Create a controller
    pub fn new(shell: Arc<dyn NavigationShell>, settings: SettingsStore) -> Self {
        Self { shell, settings }
    }

    /// Destination used by the next exit; unreadable settings fall back to the default
    pub fn destination(&self) -> QuickExitDestination {
        self.settings.quick_exit_destination().unwrap_or_else(|e| {
            error!("Quick exit destination unreadable, using default: {}", e);
            QuickExitDestination::default()
        })
    }

    /// Clear, then navigate. Navigation failures are logged, never surfaced.
    pub fn execute(&self) {
        self.shell.clear_visible_state();

        let destination = self.destination();
        match self.shell.navigate_to(destination.url()) {
            Ok(()) => info!("Quick exit to {:?}", destination),
            Err(e) => error!("Quick exit navigation failed: {}", e),
        }
    }
}
