//! Error types

/// Network guard errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local onion proxy error
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Anonymity routing is enabled, not connected, and the fallback blocks
    #[error("Anonymity routing is unavailable")]
    RoutingUnavailable,

    /// Settings or trusted-network storage error
    #[error("Guard error: {0}")]
    Guard(#[from] haven_guard::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
