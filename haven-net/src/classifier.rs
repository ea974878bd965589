//! Network privacy classifier
//!
//! Maps the current connection to a coarse privacy level. Only on-device
//! signal is used (connection type and SSID) and nothing is sent anywhere.
//! SSIDs are never logged.
//!
//! | Connection                | Level      |
//! |---------------------------|------------|
//! | Cellular                  | `Good`     |
//! | Wi-Fi, trusted SSID       | `Good`     |
//! | Wi-Fi, untrusted SSID     | `Caution`  |
//! | Wi-Fi, SSID not readable  | `Caution`  |
//! | VPN or ethernet           | `Moderate` |
//! | None                      | `Offline`  |
//! | Other, timeout, error     | `Unknown`  |

use crate::connectivity::{ConnectionType, ConnectivityProvider, ConnectivitySnapshot};
use haven_guard::{SettingFlag, SettingsStore, TrustedNetworkStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Coarse privacy level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyLevel {
    /// Low observability
    Good,
    /// Some observability
    Moderate,
    /// Likely observed by a third party
    Caution,
    /// No connection
    Offline,
    /// Couldn't classify
    Unknown,
}

/// Why a level isn't `Good`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkWarning {
    /// Wi-Fi network the user hasn't trusted
    UntrustedWifi,
    /// Wi-Fi whose name the platform won't reveal
    UnidentifiedWifi,
    /// Traffic leaves through a VPN or wired network we can't vouch for
    SharedInfrastructure,
    /// Connectivity couldn't be read in time
    StatusUnavailable,
}

/// What the user could do about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSuggestion {
    /// Trust the network if it's yours, otherwise avoid it
    TrustOrAvoid,
    /// Switch to mobile data for sensitive searches
    UseMobileData,
    /// Turn on anonymity routing
    EnableAnonymityRouting,
}

/// Derived privacy status; recomputed on every call, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPrivacyStatus {
    /// Connection type, when known
    pub connection_type: Option<ConnectionType>,
    /// Privacy level
    pub level: PrivacyLevel,
    /// Wi-Fi SSID, when known
    pub ssid: Option<String>,
    /// Warning, unless warnings are turned off
    pub warning: Option<NetworkWarning>,
    /// Suggestion, unless warnings are turned off
    pub suggestion: Option<NetworkSuggestion>,
}

impl NetworkPrivacyStatus {
    fn unknown(warning: Option<NetworkWarning>) -> Self {
        Self {
            connection_type: None,
            level: PrivacyLevel::Unknown,
            ssid: None,
            warning,
            suggestion: None,
        }
    }

    fn without_guidance(mut self) -> Self {
        self.warning = None;
        self.suggestion = None;
        self
    }
}

/// Classify a snapshot
pub fn evaluate(snapshot: &ConnectivitySnapshot, trusted: bool) -> NetworkPrivacyStatus {
    let (level, warning, suggestion) = match snapshot.connection_type {
        ConnectionType::Cellular => (PrivacyLevel::Good, None, None),
        ConnectionType::Wifi if trusted => (PrivacyLevel::Good, None, None),
        ConnectionType::Wifi if snapshot.ssid.is_some() => (
            PrivacyLevel::Caution,
            Some(NetworkWarning::UntrustedWifi),
            Some(NetworkSuggestion::TrustOrAvoid),
        ),
        ConnectionType::Wifi => (
            PrivacyLevel::Caution,
            Some(NetworkWarning::UnidentifiedWifi),
            Some(NetworkSuggestion::UseMobileData),
        ),
        ConnectionType::Vpn | ConnectionType::Ethernet => (
            PrivacyLevel::Moderate,
            Some(NetworkWarning::SharedInfrastructure),
            Some(NetworkSuggestion::EnableAnonymityRouting),
        ),
        ConnectionType::None => (PrivacyLevel::Offline, None, None),
        ConnectionType::Other => (PrivacyLevel::Unknown, None, None),
    };

    NetworkPrivacyStatus {
        connection_type: Some(snapshot.connection_type),
        level,
        ssid: snapshot.ssid.clone(),
        warning,
        suggestion,
    }
}

/// Polls the OS and classifies the connection
pub struct NetworkPrivacyClassifier {
    provider: Arc<dyn ConnectivityProvider>,
    settings: SettingsStore,
    trusted: TrustedNetworkStore,
    timeout: Duration,
}

impl NetworkPrivacyClassifier {
    /// Create a classifier; every OS query is bounded by `timeout`
    pub fn new(
        provider: Arc<dyn ConnectivityProvider>,
        settings: SettingsStore,
        trusted: TrustedNetworkStore,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            settings,
            trusted,
            timeout,
        }
    }

    /// Classify the current connection
    ///
    /// With monitoring off the OS isn't queried and the level is `Unknown`.
    /// A timeout or probe error also yields `Unknown`, never a safe level.
    pub async fn classify(&self) -> NetworkPrivacyStatus {
        let monitoring = self
            .settings
            .flag(SettingFlag::NetworkMonitoring)
            .unwrap_or_else(|e| {
                warn!("Monitoring flag unreadable: {}", e);
                false
            });
        if !monitoring {
            return NetworkPrivacyStatus::unknown(None);
        }

        let warnings = self
            .settings
            .flag(SettingFlag::NetworkWarnings)
            .unwrap_or(true);

        let snapshot = match tokio::time::timeout(self.timeout, self.provider.current()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!("Connectivity probe failed: {}", e);
                return Self::guidance(Self::unavailable(), warnings);
            }
            Err(_) => {
                warn!("Connectivity probe timed out after {:?}", self.timeout);
                return Self::guidance(Self::unavailable(), warnings);
            }
        };

        let trusted = match &snapshot.ssid {
            Some(ssid) if snapshot.connection_type == ConnectionType::Wifi => {
                self.trusted.contains(ssid).unwrap_or_else(|e| {
                    warn!("Trusted networks unreadable: {}", e);
                    false
                })
            }
            _ => false,
        };

        let status = evaluate(&snapshot, trusted);
        debug!(
            "Network classified: {:?} -> {:?}",
            snapshot.connection_type, status.level
        );
        Self::guidance(status, warnings)
    }

    fn unavailable() -> NetworkPrivacyStatus {
        NetworkPrivacyStatus::unknown(Some(NetworkWarning::StatusUnavailable))
    }

    fn guidance(status: NetworkPrivacyStatus, warnings: bool) -> NetworkPrivacyStatus {
        if warnings {
            status
        } else {
            status.without_guidance()
        }
    }
}
