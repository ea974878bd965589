//! Guard state-change notifications

use crate::settings::SettingFlag;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel
const EVENT_CAPACITY: usize = 64;

/// Something the UI may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEvent {
    /// Session unlocked (PIN or biometric)
    Unlocked,
    /// Wrong PIN; `remaining` is set only while panic wipe is armed
    UnlockFailed {
        /// Attempts left before a wipe
        remaining: Option<u32>,
    },
    /// Session locked
    Locked,
    /// All local data destroyed
    PanicWipeCompleted,
    /// Quick exit ran
    QuickExitExecuted,
    /// History cleared
    HistoryCleared,
    /// A flag changed
    SettingsChanged {
        /// Flag
        flag: SettingFlag,
        /// New value
        enabled: bool,
    },
    /// PIN set, changed or removed
    CredentialChanged,
    /// Network added to the trusted set
    NetworkTrusted,
    /// Network removed from the trusted set
    NetworkUntrusted,
}

/// Fan-out of [`GuardEvent`]s
///
/// Sending with no subscribers is fine; slow subscribers lose the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GuardEvent>,
}

impl EventBus {
    /// Create a bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.sender.subscribe()
    }

    /// Publish an event
    pub fn emit(&self, event: GuardEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new().emit(GuardEvent::Locked);
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(GuardEvent::Unlocked);
        bus.emit(GuardEvent::Locked);
        assert_eq!(rx.try_recv().unwrap(), GuardEvent::Unlocked);
        assert_eq!(rx.try_recv().unwrap(), GuardEvent::Locked);
        assert!(rx.try_recv().is_err());
    }
}
