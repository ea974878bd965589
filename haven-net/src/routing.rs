//! Anonymity routing controller
//!
//! Tracks whether traffic can go through the local onion proxy. Routing is
//! opportunistic: when the proxy is missing or unreachable the configured
//! [`RoutingFallback`] decides between the normal path and refusing.
//!
//! State is refreshed by polling; every probe is bounded by the configured
//! timeout, and a timeout counts as unreachable.

use crate::config::NetConfig;
use crate::copy::routing_message;
use crate::{Error, Result};
use async_trait::async_trait;
use haven_guard::{OfflineGate, SettingFlag, SettingsStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Routing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingState {
    /// Routing turned off
    Disabled,
    /// Turned on, proxy app not installed
    EnabledNoProxy,
    /// Turned on, proxy installed but not answering or not routing
    EnabledProxyUnreachable,
    /// Turned on and verified end to end
    EnabledConnected,
}

/// Why routing isn't connected, when a probe told us more than the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingCause {
    /// Offline mode blocked the verification request
    OfflineMode,
    /// A probe exceeded its time budget
    TimedOut,
    /// The proxy answered but the check request wasn't onion-routed
    VerificationFailed,
}

/// What to do with traffic when routing is on but not connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingFallback {
    /// Use the normal network path
    Direct,
    /// Refuse the request
    Block,
}

/// How a request should leave the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Normal network path
    Direct,
    /// Through the onion proxy
    Onion {
        /// `socks5h://` proxy URL
        proxy_url: String,
    },
}

impl Route {
    /// HTTP client for this route
    pub fn http_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder().timeout(timeout);
        let builder = match self {
            Route::Direct => builder,
            Route::Onion { proxy_url } => builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?),
        };
        Ok(builder.build()?)
    }
}

/// Derived routing status; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymityRoutingStatus {
    /// Routing state
    pub state: RoutingState,
    /// Routing turned on
    pub enabled: bool,
    /// Proxy app installed
    pub proxy_installed: bool,
    /// Proxy port answering
    pub proxy_reachable: bool,
    /// Check request confirmed onion routing
    pub connected_via_onion: bool,
    /// Extra detail for a non-connected state
    pub cause: Option<RoutingCause>,
    /// Human-readable summary
    pub message: String,
}

impl AnonymityRoutingStatus {
    fn build(
        state: RoutingState,
        proxy_installed: bool,
        proxy_reachable: bool,
        cause: Option<RoutingCause>,
    ) -> Self {
        Self {
            state,
            enabled: state != RoutingState::Disabled,
            proxy_installed,
            proxy_reachable,
            connected_via_onion: state == RoutingState::EnabledConnected,
            cause,
            message: routing_message(state, cause).to_string(),
        }
    }

    /// Status for routing turned off
    pub fn disabled() -> Self {
        Self::build(RoutingState::Disabled, false, false, None)
    }
}

/// Local onion proxy process
#[async_trait]
pub trait OnionProxy: Send + Sync {
    /// Whether the proxy app is installed
    fn is_installed(&self) -> bool;

    /// Whether the SOCKS port accepts connections
    async fn is_reachable(&self) -> Result<bool>;

    /// Whether a request through the proxy is onion-routed
    async fn verify_onion_route(&self) -> Result<bool>;

    /// Launch the proxy app through the OS
    fn launch_app(&self) -> Result<()>;

    /// `socks5h://` proxy URL
    fn proxy_url(&self) -> String;
}

/// Anonymity routing controller
pub struct AnonymityRoutingController {
    proxy: Arc<dyn OnionProxy>,
    settings: SettingsStore,
    offline: OfflineGate,
    fallback: RoutingFallback,
    timeout: Duration,
    status: RwLock<AnonymityRoutingStatus>,
}

impl AnonymityRoutingController {
    /// Create a controller
    pub fn new(
        proxy: Arc<dyn OnionProxy>,
        settings: SettingsStore,
        offline: OfflineGate,
        config: &NetConfig,
    ) -> Self {
        Self {
            proxy,
            settings,
            offline,
            fallback: config.fallback,
            timeout: config.probe_timeout(),
            status: RwLock::new(AnonymityRoutingStatus::disabled()),
        }
    }

    /// Whether routing is turned on
    ///
    /// An unreadable flag counts as on, so traffic is never silently de-anonymized.
    pub fn is_enabled(&self) -> bool {
        self.settings.flag(SettingFlag::Tor).unwrap_or_else(|e| {
            warn!("Routing flag unreadable, treating as enabled: {}", e);
            true
        })
    }

    /// Turn routing on or off
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.settings.set_flag(SettingFlag::Tor, enabled)?;
        if !enabled {
            *self.status.write() = AnonymityRoutingStatus::disabled();
        }
        info!("Anonymity routing {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Last computed status
    pub fn status(&self) -> AnonymityRoutingStatus {
        self.status.read().clone()
    }

    /// Probe the proxy and recompute the status
    pub async fn refresh_status(&self) -> AnonymityRoutingStatus {
        let status = self.probe().await;
        debug!("Routing status: {:?}", status.state);
        *self.status.write() = status.clone();
        status
    }

    async fn probe(&self) -> AnonymityRoutingStatus {
        if !self.is_enabled() {
            return AnonymityRoutingStatus::disabled();
        }
        if !self.proxy.is_installed() {
            return AnonymityRoutingStatus::build(RoutingState::EnabledNoProxy, false, false, None);
        }

        let not_connected = |reachable, cause| {
            AnonymityRoutingStatus::build(
                RoutingState::EnabledProxyUnreachable,
                true,
                reachable,
                cause,
            )
        };

        match tokio::time::timeout(self.timeout, self.proxy.is_reachable()).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => return not_connected(false, None),
            Ok(Err(e)) => {
                warn!("Proxy reachability probe failed: {}", e);
                return not_connected(false, None);
            }
            Err(_) => return not_connected(false, Some(RoutingCause::TimedOut)),
        }

        // The check request is a network call like any other.
        if self.offline.is_enabled() {
            return not_connected(true, Some(RoutingCause::OfflineMode));
        }

        match tokio::time::timeout(self.timeout, self.proxy.verify_onion_route()).await {
            Ok(Ok(true)) => {
                AnonymityRoutingStatus::build(RoutingState::EnabledConnected, true, true, None)
            }
            Ok(Ok(false)) => not_connected(true, Some(RoutingCause::VerificationFailed)),
            Ok(Err(e)) => {
                warn!("Onion route verification failed: {}", e);
                not_connected(true, Some(RoutingCause::VerificationFailed))
            }
            Err(_) => not_connected(true, Some(RoutingCause::TimedOut)),
        }
    }

    /// Ask the OS to launch the proxy app
    pub fn open_proxy_app(&self) -> Result<()> {
        self.proxy.launch_app()
    }

    /// Route for the next outbound request
    ///
    /// Uses the last refreshed status. Fails while offline mode is on.
    pub fn route(&self) -> Result<Route> {
        if self.offline.is_enabled() {
            return Err(Error::RoutingUnavailable);
        }
        if !self.is_enabled() {
            return Ok(Route::Direct);
        }
        if self.status.read().state == RoutingState::EnabledConnected {
            return Ok(Route::Onion {
                proxy_url: self.proxy.proxy_url(),
            });
        }

        match self.fallback {
            RoutingFallback::Direct => {
                debug!("Onion route not connected, falling back to direct");
                Ok(Route::Direct)
            }
            RoutingFallback::Block => Err(Error::RoutingUnavailable),
        }
    }
}
