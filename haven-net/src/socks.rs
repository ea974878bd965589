//! SOCKS-based onion proxy probe
//!
//! Talks to an external proxy app (Orbot or similar) over its local SOCKS
//! port. Reachability is a plain TCP connect; verification sends one request
//! through `socks5h://` so DNS resolves on the proxy side.

use crate::config::{NetConfig, ProxyConfig};
use crate::routing::OnionProxy;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// OS app-launch primitive
pub trait AppLauncher: Send + Sync {
    /// Whether the app is installed
    fn is_installed(&self, app_id: &str) -> bool;

    /// Launch the app (or its store page when missing)
    fn launch(&self, app_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(rename = "IsTor")]
    is_tor: bool,
}

/// [`OnionProxy`] backed by a local SOCKS5 port
pub struct SocksOnionProxy {
    proxy: ProxyConfig,
    check_url: String,
    app_id: String,
    timeout: Duration,
    launcher: Arc<dyn AppLauncher>,
}

impl SocksOnionProxy {
    /// Create a probe from the network configuration
    pub fn new(config: &NetConfig, launcher: Arc<dyn AppLauncher>) -> Self {
        Self {
            proxy: config.proxy.clone(),
            check_url: config.check_url.clone(),
            app_id: config.proxy_app_id.clone(),
            timeout: config.probe_timeout(),
            launcher,
        }
    }
}

#[async_trait]
impl OnionProxy for SocksOnionProxy {
    fn is_installed(&self) -> bool {
        self.launcher.is_installed(&self.app_id)
    }

    async fn is_reachable(&self) -> Result<bool> {
        match TcpStream::connect(self.proxy.socket_addr()).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("SOCKS port closed: {}", e);
                Ok(false)
            }
        }
    }

    async fn verify_onion_route(&self) -> Result<bool> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .proxy(reqwest::Proxy::all(self.proxy.proxy_url())?)
            .build()?;

        let response = client
            .get(&self.check_url)
            .send()
            .await?
            .error_for_status()?;
        let check: CheckResponse = response.json().await?;
        Ok(check.is_tor)
    }

    fn launch_app(&self) -> Result<()> {
        info!("Launching proxy app");
        self.launcher
            .launch(&self.app_id)
            .map_err(|e| Error::Proxy(format!("Failed to launch proxy app: {}", e)))
    }

    fn proxy_url(&self) -> String {
        self.proxy.proxy_url()
    }
}
