//! Network configuration

use crate::routing::RoutingFallback;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local SOCKS proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy host
    pub host: String,
    /// SOCKS port
    pub port: u16,
}

impl ProxyConfig {
    /// Create new proxy config
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Proxy URL with remote DNS resolution, so lookups don't leak
    pub fn proxy_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 9050)
    }
}

/// Network guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Upper bound for any single probe
    pub probe_timeout_secs: u64,
    /// Local onion proxy
    pub proxy: ProxyConfig,
    /// Behaviour when routing is enabled but not connected
    pub fallback: RoutingFallback,
    /// Endpoint answering `{"IsTor": true}` for onion-routed requests
    pub check_url: String,
    /// Package or bundle id of the proxy app
    pub proxy_app_id: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
            proxy: ProxyConfig::default(),
            fallback: RoutingFallback::Direct,
            check_url: "https://check.torproject.org/api/ip".to_string(),
            proxy_app_id: "org.torproject.android".to_string(),
        }
    }
}

impl NetConfig {
    /// Probe timeout as a duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
