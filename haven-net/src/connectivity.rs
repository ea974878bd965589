//! OS connectivity seam

use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Kind of active connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Wi-Fi
    Wifi,
    /// Mobile data
    Cellular,
    /// Wired
    Ethernet,
    /// VPN tunnel
    Vpn,
    /// Not connected
    None,
    /// Platform couldn't tell
    Other,
}

/// What the OS reports about the current connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    /// Connection type
    pub connection_type: ConnectionType,
    /// Wi-Fi SSID, when the platform permits reading it
    pub ssid: Option<String>,
}

impl ConnectivitySnapshot {
    /// Snapshot without an SSID
    pub fn new(connection_type: ConnectionType) -> Self {
        Self {
            connection_type,
            ssid: None,
        }
    }

    /// Wi-Fi snapshot with an SSID
    pub fn wifi(ssid: impl Into<String>) -> Self {
        Self {
            connection_type: ConnectionType::Wifi,
            ssid: Some(ssid.into()),
        }
    }
}

/// OS connectivity API
///
/// Implementations read on-device state only.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync {
    /// Current connection
    async fn current(&self) -> Result<ConnectivitySnapshot>;
}

/// Provider returning a fixed snapshot, optionally after a delay
pub struct StaticConnectivity {
    snapshot: Mutex<ConnectivitySnapshot>,
    delay: Mutex<Option<Duration>>,
}

impl StaticConnectivity {
    /// Provider reporting `snapshot`
    pub fn new(snapshot: ConnectivitySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            delay: Mutex::new(None),
        }
    }

    /// Replace the reported snapshot
    pub fn set(&self, snapshot: ConnectivitySnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    /// Make every query stall for `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }
}

#[async_trait]
impl ConnectivityProvider for StaticConnectivity {
    async fn current(&self) -> Result<ConnectivitySnapshot> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.snapshot.lock().clone())
    }
}
