//! Secure credential store
//!
//! Owns the salted PIN hash. Verification is pure: it never touches the
//! attempt counters, which are the guard's responsibility.

use crate::config::KdfParams;
use crate::policy::validate_pin;
use crate::security::PinHasher;
use crate::storage::{get_json, keys, put_json, SecureStorage};
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// A PIN as typed by the user
///
/// The digits are zeroized when the value is dropped, which happens at the end
/// of the guard call that consumed it.
pub struct Pin(Zeroizing<String>);

impl Pin {
    /// Borrow the digits
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pin {
    fn from(value: &str) -> Self {
        Self(Zeroizing::new(value.to_string()))
    }
}

impl From<String> for Pin {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}

/// Persisted PIN credential
#[derive(Clone, Serialize, Deserialize)]
struct PinCredential {
    /// Argon2id PHC string
    hash: String,
    /// Unix timestamp (seconds)
    created_at: i64,
    /// Digit count
    length: u8,
}

impl Drop for PinCredential {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.hash);
    }
}

/// Non-secret facts about the stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialInfo {
    /// Unix timestamp (seconds) when the PIN was set
    pub created_at: i64,
    /// Number of digits
    pub length: u8,
}

/// Store for the unlock PIN
pub struct CredentialStore {
    storage: Arc<dyn SecureStorage>,
    hasher: PinHasher,
    decoy_hash: OnceCell<String>,
}

impl CredentialStore {
    /// Create a store over the given storage
    pub fn new(storage: Arc<dyn SecureStorage>, params: &KdfParams) -> Result<Self> {
        Ok(Self {
            storage,
            hasher: PinHasher::new(params)?,
            decoy_hash: OnceCell::new(),
        })
    }

    fn load(&self) -> Result<Option<PinCredential>> {
        get_json(self.storage.as_ref(), keys::PIN_CREDENTIAL)
    }

    /// Whether a PIN has been set up
    pub fn has_credential(&self) -> Result<bool> {
        Ok(self.storage.get(keys::PIN_CREDENTIAL)?.is_some())
    }

    /// Creation time and length of the stored PIN
    pub fn credential_info(&self) -> Result<Option<CredentialInfo>> {
        Ok(self.load()?.map(|c| CredentialInfo {
            created_at: c.created_at,
            length: c.length,
        }))
    }

    /// Hash and store a PIN, replacing any previous one
    ///
    /// PINs failing the strength policy are rejected before anything is written.
    pub fn set_credential(&self, pin: &Pin) -> Result<()> {
        let validation = validate_pin(pin.expose());
        if let Some(reason) = validation.reason {
            debug!("PIN rejected by strength policy: {}", reason);
            return Err(Error::Policy(reason));
        }

        let credential = PinCredential {
            hash: self.hasher.hash(pin.expose())?,
            created_at: chrono::Utc::now().timestamp(),
            length: pin.expose().len() as u8,
        };
        put_json(self.storage.as_ref(), keys::PIN_CREDENTIAL, &credential)?;
        info!("PIN credential stored");
        Ok(())
    }

    /// Check a PIN against the stored hash
    ///
    /// Runs one full Argon2id derivation for every input, including inputs of
    /// the wrong length and the no-credential case (which verifies against a
    /// throwaway hash), so the response time doesn't depend on the input.
    pub fn verify_credential(&self, pin: &Pin) -> Result<bool> {
        match self.load()? {
            Some(credential) => self.hasher.verify(pin.expose(), &credential.hash),
            None => {
                let decoy = self.decoy_hash()?;
                let _ = self.hasher.verify(pin.expose(), decoy)?;
                Ok(false)
            }
        }
    }

    fn decoy_hash(&self) -> Result<&String> {
        self.decoy_hash.get_or_try_init(|| {
            let filler: Zeroizing<String> = Zeroizing::new(
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect(),
            );
            self.hasher.hash(&filler)
        })
    }

    /// Delete the stored PIN
    pub fn remove_credential(&self) -> Result<()> {
        self.storage.delete(keys::PIN_CREDENTIAL)?;
        info!("PIN credential removed");
        Ok(())
    }

    /// Delete every blob in the underlying storage, credential first
    pub fn wipe_all(&self) -> Result<()> {
        self.storage.delete(keys::PIN_CREDENTIAL)?;
        self.storage.clear()
    }
}
