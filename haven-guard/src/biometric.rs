//! Biometric unlock support
//!
//! A successful biometric check stands in for the PIN and nothing more: the
//! guard only consults it when a PIN exists and the user enabled it.

use crate::Error;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Available biometric sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricKind {
    /// No usable sensor
    None,
    /// Fingerprint sensor
    Fingerprint,
    /// Face recognition
    Face,
}

/// Outcome of a biometric prompt
#[derive(Debug)]
pub enum BiometricResult {
    /// User authenticated
    Success,
    /// Biometric didn't match
    Failed,
    /// User dismissed the prompt
    Cancelled,
    /// No sensor or nothing enrolled
    NotAvailable,
    /// Platform error
    Error(Error),
}

impl BiometricResult {
    /// Whether the user authenticated
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// OS biometric API
pub trait BiometricAuthenticator: Send + Sync {
    /// Probe the sensor
    fn available(&self) -> BiometricKind;

    /// Show the system prompt
    fn authenticate(&self, reason: &str) -> BiometricResult;
}

/// Scripted authenticator for tests and platforms without a sensor bridge
pub struct MockBiometric {
    kind: BiometricKind,
    scripted: Mutex<VecDeque<BiometricResult>>,
    prompts: Mutex<Vec<String>>,
}

impl MockBiometric {
    /// Authenticator reporting the given sensor; prompts succeed unless scripted
    pub fn new(kind: BiometricKind) -> Self {
        Self {
            kind,
            scripted: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Device without a sensor
    pub fn unavailable() -> Self {
        Self::new(BiometricKind::None)
    }

    /// Queue the result of the next prompt
    pub fn push_result(&self, result: BiometricResult) {
        self.scripted.lock().push_back(result);
    }

    /// Reasons passed to every prompt so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl BiometricAuthenticator for MockBiometric {
    fn available(&self) -> BiometricKind {
        self.kind
    }

    fn authenticate(&self, reason: &str) -> BiometricResult {
        self.prompts.lock().push(reason.to_string());
        if self.kind == BiometricKind::None {
            return BiometricResult::NotAvailable;
        }
        self.scripted
            .lock()
            .pop_front()
            .unwrap_or(BiometricResult::Success)
    }
}

/// Thin wrapper that refuses to prompt when no sensor is present
#[derive(Clone)]
pub struct BiometricGate {
    authenticator: Arc<dyn BiometricAuthenticator>,
}

impl BiometricGate {
    /// Wrap an OS authenticator
    pub fn new(authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        Self { authenticator }
    }

    /// Sensor kind
    pub fn is_available(&self) -> BiometricKind {
        self.authenticator.available()
    }

    /// Prompt the user
    pub fn authenticate(&self, reason: &str) -> BiometricResult {
        if self.is_available() == BiometricKind::None {
            return BiometricResult::NotAvailable;
        }
        let result = self.authenticator.authenticate(reason);
        debug!("Biometric prompt finished: success={}", result.is_success());
        result
    }
}
