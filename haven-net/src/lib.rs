//! Network privacy layer for the Haven guard
//!
//! Classifies how observable the current connection is and manages
//! opportunistic routing through a local onion proxy. Everything here is
//! async because the probes touch real I/O, and every probe is
//! timeout-bounded so the unlock screen never hangs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod config;
pub mod connectivity;
pub mod copy;
pub mod error;
pub mod routing;
pub mod socks;

pub use classifier::{
    evaluate, NetworkPrivacyClassifier, NetworkPrivacyStatus, NetworkSuggestion, NetworkWarning,
    PrivacyLevel,
};
pub use config::{NetConfig, ProxyConfig};
pub use connectivity::{
    ConnectionType, ConnectivityProvider, ConnectivitySnapshot, StaticConnectivity,
};
pub use error::{Error, Result};
pub use routing::{
    AnonymityRoutingController, AnonymityRoutingStatus, OnionProxy, Route, RoutingCause,
    RoutingFallback, RoutingState,
};
pub use socks::{AppLauncher, SocksOnionProxy};
