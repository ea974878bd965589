//! Error types

use crate::policy::PinRejection;

/// Guard errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// PIN rejected by the strength policy (nothing was stored)
    #[error("PIN rejected: {0}")]
    Policy(PinRejection),

    /// Secure storage unavailable or failing
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No PIN has been set up yet
    #[error("No PIN credential is configured")]
    NoCredential,

    /// A PIN already exists; use change_pin instead
    #[error("A PIN credential already exists")]
    CredentialExists,

    /// Biometric unlock is disabled, unconfigured, or has no sensor
    #[error("Biometric authentication is not available")]
    BiometricUnavailable,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
