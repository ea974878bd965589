//! Safety settings, quick-exit destination and trusted networks
//!
//! Each flag lives under its own storage key so flags can be read and written
//! independently.

use crate::storage::{get_json, keys, put_json, SecureStorage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Independently persisted boolean setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingFlag {
    /// Biometric unlock (requires a PIN)
    Biometric,
    /// Serve cached data only, no outbound calls
    OfflineMode,
    /// Route through the local onion proxy
    Tor,
    /// Encrypt local data at rest
    Encryption,
    /// Quick exit button and gestures
    QuickExit,
    /// Shake to clear history
    ShakeToClear,
    /// Network privacy classification
    NetworkMonitoring,
    /// Warning text for risky networks
    NetworkWarnings,
    /// Crash reports
    CrashReporting,
    /// Share profile with the in-app assistant
    ShareProfileWithAssistant,
}

impl SettingFlag {
    /// Every flag
    pub const ALL: [SettingFlag; 10] = [
        Self::Biometric,
        Self::OfflineMode,
        Self::Tor,
        Self::Encryption,
        Self::QuickExit,
        Self::ShakeToClear,
        Self::NetworkMonitoring,
        Self::NetworkWarnings,
        Self::CrashReporting,
        Self::ShareProfileWithAssistant,
    ];

    /// Storage key
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Biometric => "settings.biometric_enabled",
            Self::OfflineMode => "settings.offline_mode_enabled",
            Self::Tor => "settings.tor_enabled",
            Self::Encryption => "settings.encryption_enabled",
            Self::QuickExit => "settings.quick_exit_enabled",
            Self::ShakeToClear => "settings.shake_to_clear_enabled",
            Self::NetworkMonitoring => "settings.network_monitoring_enabled",
            Self::NetworkWarnings => "settings.network_warnings_enabled",
            Self::CrashReporting => "settings.crash_reporting_enabled",
            Self::ShareProfileWithAssistant => "settings.share_profile_with_assistant",
        }
    }

    /// Value before the user changes it
    pub fn default_value(&self) -> bool {
        matches!(
            self,
            Self::QuickExit | Self::NetworkMonitoring | Self::NetworkWarnings
        )
    }
}

/// Snapshot of every flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySettings {
    /// See [`SettingFlag::Biometric`]
    pub biometric_enabled: bool,
    /// See [`SettingFlag::OfflineMode`]
    pub offline_mode_enabled: bool,
    /// See [`SettingFlag::Tor`]
    pub tor_enabled: bool,
    /// See [`SettingFlag::Encryption`]
    pub encryption_enabled: bool,
    /// See [`SettingFlag::QuickExit`]
    pub quick_exit_enabled: bool,
    /// See [`SettingFlag::ShakeToClear`]
    pub shake_to_clear_enabled: bool,
    /// See [`SettingFlag::NetworkMonitoring`]
    pub network_monitoring_enabled: bool,
    /// See [`SettingFlag::NetworkWarnings`]
    pub network_warnings_enabled: bool,
    /// See [`SettingFlag::CrashReporting`]
    pub crash_reporting_enabled: bool,
    /// See [`SettingFlag::ShareProfileWithAssistant`]
    pub share_profile_with_assistant: bool,
}

impl SafetySettings {
    /// Read one flag
    pub fn get(&self, flag: SettingFlag) -> bool {
        match flag {
            SettingFlag::Biometric => self.biometric_enabled,
            SettingFlag::OfflineMode => self.offline_mode_enabled,
            SettingFlag::Tor => self.tor_enabled,
            SettingFlag::Encryption => self.encryption_enabled,
            SettingFlag::QuickExit => self.quick_exit_enabled,
            SettingFlag::ShakeToClear => self.shake_to_clear_enabled,
            SettingFlag::NetworkMonitoring => self.network_monitoring_enabled,
            SettingFlag::NetworkWarnings => self.network_warnings_enabled,
            SettingFlag::CrashReporting => self.crash_reporting_enabled,
            SettingFlag::ShareProfileWithAssistant => self.share_profile_with_assistant,
        }
    }

    fn set(&mut self, flag: SettingFlag, value: bool) {
        let slot = match flag {
            SettingFlag::Biometric => &mut self.biometric_enabled,
            SettingFlag::OfflineMode => &mut self.offline_mode_enabled,
            SettingFlag::Tor => &mut self.tor_enabled,
            SettingFlag::Encryption => &mut self.encryption_enabled,
            SettingFlag::QuickExit => &mut self.quick_exit_enabled,
            SettingFlag::ShakeToClear => &mut self.shake_to_clear_enabled,
            SettingFlag::NetworkMonitoring => &mut self.network_monitoring_enabled,
            SettingFlag::NetworkWarnings => &mut self.network_warnings_enabled,
            SettingFlag::CrashReporting => &mut self.crash_reporting_enabled,
            SettingFlag::ShareProfileWithAssistant => &mut self.share_profile_with_assistant,
        };
        *slot = value;
    }
}

impl Default for SafetySettings {
    fn default() -> Self {
        let mut settings = Self {
            biometric_enabled: false,
            offline_mode_enabled: false,
            tor_enabled: false,
            encryption_enabled: false,
            quick_exit_enabled: false,
            shake_to_clear_enabled: false,
            network_monitoring_enabled: false,
            network_warnings_enabled: false,
            crash_reporting_enabled: false,
            share_profile_with_assistant: false,
        };
        for flag in SettingFlag::ALL {
            settings.set(flag, flag.default_value());
        }
        settings
    }
}

/// Pre-approved neutral sites for quick exit
///
/// Deliberately a closed set: nothing typed during a panic can end up as the
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuickExitDestination {
    /// Search engine home page
    GoogleSearch,
    /// Weather forecast
    Weather,
    /// General news
    News,
    /// Encyclopedia front page
    Wikipedia,
}

impl QuickExitDestination {
    /// Every destination; the first is the default
    pub const ALL: [QuickExitDestination; 4] =
        [Self::GoogleSearch, Self::Weather, Self::News, Self::Wikipedia];

    /// Target URL
    pub fn url(&self) -> &'static str {
        match self {
            Self::GoogleSearch => "https://www.google.com",
            Self::Weather => "https://weather.com",
            Self::News => "https://news.google.com",
            Self::Wikipedia => "https://www.wikipedia.org",
        }
    }
}

impl Default for QuickExitDestination {
    fn default() -> Self {
        Self::ALL[0]
    }
}

/// Flag persistence
#[derive(Clone)]
pub struct SettingsStore {
    storage: Arc<dyn SecureStorage>,
}

impl SettingsStore {
    /// Create over the given storage
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Read one flag
    pub fn flag(&self, flag: SettingFlag) -> Result<bool> {
        match self.storage.get(flag.storage_key())? {
            Some(bytes) => Ok(bytes.first().copied() == Some(1)),
            None => Ok(flag.default_value()),
        }
    }

    /// Write one flag
    pub fn set_flag(&self, flag: SettingFlag, enabled: bool) -> Result<()> {
        self.storage.set(flag.storage_key(), &[enabled as u8])?;
        debug!("Setting {:?} = {}", flag, enabled);
        Ok(())
    }

    /// Read every flag
    pub fn snapshot(&self) -> Result<SafetySettings> {
        let mut settings = SafetySettings::default();
        for flag in SettingFlag::ALL {
            settings.set(flag, self.flag(flag)?);
        }
        Ok(settings)
    }

    /// Selected quick-exit destination
    pub fn quick_exit_destination(&self) -> Result<QuickExitDestination> {
        Ok(get_json(self.storage.as_ref(), keys::QUICK_EXIT_DESTINATION)?.unwrap_or_default())
    }

    /// Select a quick-exit destination
    pub fn set_quick_exit_destination(&self, destination: QuickExitDestination) -> Result<()> {
        put_json(self.storage.as_ref(), keys::QUICK_EXIT_DESTINATION, &destination)
    }

    /// Delete every flag and the destination
    pub fn clear(&self) -> Result<()> {
        let mut first_error = None;
        for flag in SettingFlag::ALL {
            if let Err(e) = self.storage.delete(flag.storage_key()) {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.storage.delete(keys::QUICK_EXIT_DESTINATION) {
            first_error.get_or_insert(e);
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Wi-Fi networks the user explicitly marked safe
///
/// Only ever changed by an explicit user action.
#[derive(Clone)]
pub struct TrustedNetworkStore {
    storage: Arc<dyn SecureStorage>,
}

impl TrustedNetworkStore {
    /// Create over the given storage
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    fn load(&self) -> Result<BTreeSet<String>> {
        Ok(get_json(self.storage.as_ref(), keys::TRUSTED_NETWORKS)?.unwrap_or_default())
    }

    fn save(&self, set: &BTreeSet<String>) -> Result<()> {
        put_json(self.storage.as_ref(), keys::TRUSTED_NETWORKS, set)
    }

    fn normalize(ssid: &str) -> Result<String> {
        let ssid = ssid.trim();
        if ssid.is_empty() {
            return Err(Error::Validation("SSID must not be empty".to_string()));
        }
        Ok(ssid.to_string())
    }

    /// Mark a network as trusted; returns false if it already was
    pub fn trust(&self, ssid: &str) -> Result<bool> {
        let ssid = Self::normalize(ssid)?;
        let mut set = self.load()?;
        let added = set.insert(ssid);
        if added {
            self.save(&set)?;
        }
        Ok(added)
    }

    /// Remove a network; returns false if it wasn't trusted
    pub fn untrust(&self, ssid: &str) -> Result<bool> {
        let mut set = self.load()?;
        let removed = set.remove(ssid.trim());
        if removed {
            self.save(&set)?;
        }
        Ok(removed)
    }

    /// Whether a network is trusted (exact, case-sensitive match)
    pub fn contains(&self, ssid: &str) -> Result<bool> {
        Ok(self.load()?.contains(ssid.trim()))
    }

    /// Trusted networks in sorted order
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_iter().collect())
    }

    /// Forget every trusted network
    pub fn clear(&self) -> Result<()> {
        self.storage.delete(keys::TRUSTED_NETWORKS)
    }
}
