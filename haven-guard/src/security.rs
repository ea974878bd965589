//! Security and encryption primitives
//!
//! Implements Argon2id hashing for the unlock PIN and ChaCha20-Poly1305 sealing
//! for blobs written to disk, with key zeroization.

use crate::config::KdfParams;
use crate::{Error, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder, Version,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Sealed blob format version
const BLOB_VERSION: u8 = 1;
/// Algorithm tag for ChaCha20-Poly1305
const ALGORITHM_CHACHA20: u8 = 1;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 2 + NONCE_LEN;

/// Master key for sealing stored blobs
#[derive(Clone)]
pub struct MasterKey {
    key: Zeroizing<[u8; 32]>,
}

impl MasterKey {
    /// Generate new random master key
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);

        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Encryption("Invalid key length".to_string()));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);

        Ok(Self {
            key: Zeroizing::new(key),
        })
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Seal plaintext
    ///
    /// Format: `[version(1)][algorithm(1)][nonce(12)][ciphertext]`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(self.key.as_ref().into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        result.push(BLOB_VERSION);
        result.push(ALGORITHM_CHACHA20);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Open a blob produced by [`MasterKey::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < HEADER_LEN {
            return Err(Error::Encryption("Invalid ciphertext length".to_string()));
        }

        if data[0] != BLOB_VERSION {
            return Err(Error::Encryption(format!(
                "Unsupported encryption version: {}",
                data[0]
            )));
        }

        if data[1] != ALGORITHM_CHACHA20 {
            return Err(Error::Encryption(format!(
                "Algorithm mismatch: expected ChaCha20-Poly1305 (1), got {}",
                data[1]
            )));
        }

        let cipher = ChaCha20Poly1305::new(self.key.as_ref().into());
        let nonce = Nonce::from_slice(&data[2..HEADER_LEN]);

        cipher
            .decrypt(nonce, &data[HEADER_LEN..])
            .map_err(|e| Error::Encryption(e.to_string()))
    }
}

fn build_params(params: &KdfParams) -> Result<Params> {
    ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .build()
        .map_err(|e| Error::Encryption(e.to_string()))
}

/// Argon2id hasher for the unlock PIN
///
/// Hashes are PHC strings, so the salt and cost parameters travel with the hash
/// and verification keeps working after the configured cost changes.
#[derive(Clone)]
pub struct PinHasher {
    params: Params,
}

impl PinHasher {
    /// Create a hasher with the given cost
    pub fn new(params: &KdfParams) -> Result<Self> {
        Ok(Self {
            params: build_params(params)?,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a PIN with a fresh random salt
    pub fn hash(&self, pin: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| Error::Encryption(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    /// Verify a PIN against a stored PHC hash
    ///
    /// The digest comparison inside `verify_password` is constant-time, and the
    /// full Argon2 derivation runs for every input regardless of its length.
    pub fn verify(&self, pin: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| Error::Encryption(e.to_string()))?;

        Ok(self
            .argon2()
            .verify_password(pin.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash data with SHA-256
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
