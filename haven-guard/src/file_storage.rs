//! Encrypted on-disk storage
//!
//! One file per key. File names are the SHA-256 of the key so nothing on disk
//! hints at what the app stores, and every blob is sealed with the master key.

use crate::security::{hash_sha256, MasterKey};
use crate::storage::SecureStorage;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BLOB_EXTENSION: &str = "blob";

/// File-backed [`SecureStorage`]
pub struct EncryptedFileStorage {
    dir: PathBuf,
    key: MasterKey,
    write_lock: Mutex<()>,
}

impl EncryptedFileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>, key: MasterKey) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("Opened encrypted storage at {}", dir.display());
        Ok(Self {
            dir,
            key,
            write_lock: Mutex::new(()),
        })
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name = hex::encode(hash_sha256(key.as_bytes()));
        self.dir.join(format!("{}.{}", name, BLOB_EXTENSION))
    }

    fn storage_err(e: std::io::Error) -> Error {
        Error::Storage(e.to_string())
    }

    // Zero-fill, then unlink.
    fn shred(path: &Path) -> Result<()> {
        let len = match fs::metadata(path) {
            Ok(meta) => meta.len() as usize,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Self::storage_err(e)),
        };
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(Self::storage_err)?;
            file.write_all(&vec![0u8; len]).map_err(Self::storage_err)?;
            file.sync_all().map_err(Self::storage_err)?;
        }
        fs::remove_file(path).map_err(Self::storage_err)
    }
}

impl SecureStorage for EncryptedFileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let sealed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::storage_err(e)),
        };
        self.key.decrypt(&sealed).map(Some)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let sealed = self.key.encrypt(value)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");

        let _guard = self.write_lock.lock();
        {
            let mut file = fs::File::create(&tmp).map_err(Self::storage_err)?;
            file.write_all(&sealed).map_err(Self::storage_err)?;
            file.sync_all().map_err(Self::storage_err)?;
        }
        fs::rename(&tmp, &path).map_err(Self::storage_err)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        Self::shred(&self.path_for(key))
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        let entries = fs::read_dir(&self.dir).map_err(Self::storage_err)?;

        let mut first_error = None;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    first_error.get_or_insert(Self::storage_err(e));
                    continue;
                }
            };
            let is_ours = path
                .extension()
                .is_some_and(|ext| ext == BLOB_EXTENSION || ext == "tmp");
            if !is_ours {
                continue;
            }
            if let Err(e) = Self::shred(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EncryptedFileStorage::open(dir.path(), MasterKey::generate()).unwrap();

        assert!(storage.get("guard.pin_credential").unwrap().is_none());
        storage.set("guard.pin_credential", b"hash").unwrap();
        assert_eq!(
            storage.get("guard.pin_credential").unwrap().as_deref(),
            Some(b"hash".as_slice())
        );
    }

    #[test]
    fn test_file_names_do_not_leak_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EncryptedFileStorage::open(dir.path(), MasterKey::generate()).unwrap();
        storage.set("guard.trusted_networks", b"[\"HomeWiFi\"]").unwrap();

        for entry in fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().into_string().unwrap();
            assert!(!name.contains("trusted"));
            let contents = fs::read(dir.path().join(&name)).unwrap();
            assert!(!contents.windows(8).any(|w| w == b"HomeWiFi"));
        }
    }

    #[test]
    fn test_wrong_key_cannot_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EncryptedFileStorage::open(dir.path(), MasterKey::generate()).unwrap();
        storage.set("k", b"v").unwrap();

        let other = EncryptedFileStorage::open(dir.path(), MasterKey::generate()).unwrap();
        assert!(other.get("k").is_err());
    }

    #[test]
    fn test_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EncryptedFileStorage::open(dir.path(), MasterKey::generate()).unwrap();
        storage.set("a", b"1").unwrap();
        storage.set("b", b"2").unwrap();
        fs::write(dir.path().join("unrelated.txt"), b"keep").unwrap();

        storage.delete("a").unwrap();
        storage.delete("a").unwrap();
        assert!(storage.get("a").unwrap().is_none());

        storage.clear().unwrap();
        assert!(storage.get("b").unwrap().is_none());
        assert!(dir.path().join("unrelated.txt").exists());
    }
}
