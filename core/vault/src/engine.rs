//! Lock, unlock, key creation and rekey.
//!
//! Every operation runs all of its checks before the first write. A refused
//! operation leaves both files exactly as they were.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::VaultConfig;
use crate::envelope::{self, EnvelopeState};
use chest_common::{Error, FileRole, Result};
use chest_crypto::{
    decrypt, encrypt, generate_iv, required_key_length, resolve_cipher, KeyMaterial,
};
use chest_storage::{FileStore, LocalStore};

/// What a rekey did to the secrets file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RekeyOutcome {
    /// The file was locked, and has been locked again under the new key.
    Relocked,
    /// The file was plaintext or absent and has not been touched.
    LeftUnlocked,
}

/// Vault engine bound to one configuration and one store.
pub struct VaultEngine<S: FileStore = LocalStore> {
    config: VaultConfig,
    store: S,
}

impl VaultEngine<LocalStore> {
    /// Create an engine over the local filesystem.
    pub fn new(config: VaultConfig) -> Self {
        Self::with_store(config, LocalStore::new())
    }
}

impl<S: FileStore> VaultEngine<S> {
    /// Create an engine over a custom store.
    pub fn with_store(config: VaultConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn require(&self, role: FileRole, path: &Path) -> Result<()> {
        if self.store.exists(path) {
            Ok(())
        } else {
            Err(Error::MissingFile {
                role,
                path: path.to_path_buf(),
            })
        }
    }

    fn read_key(&self, required: usize) -> Result<KeyMaterial> {
        let key = KeyMaterial::from_bytes(self.store.read(self.config.key_path())?);
        key.validate(required)?;
        Ok(key)
    }

    /// Classify the secrets file under the active header.
    ///
    /// # Errors
    /// - `MissingFile` if the secrets file does not exist
    pub fn state(&self, secrets: &Path) -> Result<EnvelopeState> {
        self.require(FileRole::Secrets, secrets)?;
        let data = self.store.read(secrets)?;
        Ok(envelope::classify(&data, &self.config.header()))
    }

    /// Encrypt the secrets file in place.
    ///
    /// # Preconditions
    /// Checked in this order:
    /// - Secrets file exists
    /// - Key file exists
    /// - Content is encryptable under the active header
    /// - Cipher name is in the table
    /// - Key length matches the cipher
    ///
    /// # Postconditions
    /// - The file holds `header || hex(iv) ":" hex(ciphertext)` with a fresh IV
    ///
    /// # Errors
    /// - `MissingFile`, `AlreadyLocked`, `UnknownCipher`, `InvalidKeyLength`
    /// - `Crypto` or `Io` if the cipher or the final write fails
    pub fn lock(&self, secrets: &Path) -> Result<()> {
        self.require(FileRole::Secrets, secrets)?;
        self.require(FileRole::Key, self.config.key_path())?;

        let data = self.store.read(secrets)?;
        let header = self.config.header();
        let state = envelope::classify(&data, &header);
        debug!(store = self.store.name(), path = %secrets.display(), %state, "Checking lock state");

        if !envelope::is_encryptable(&data, &header) {
            return Err(Error::AlreadyLocked);
        }
        if state == EnvelopeState::Ambiguous {
            warn!(
                path = %secrets.display(),
                occurrences = envelope::header_count(&data, &header),
                "Header appears more than once; locking the whole file"
            );
        } else if let Some(tag) = envelope::foreign_tag(&data, &header) {
            warn!(
                path = %secrets.display(),
                %tag,
                "File carries a header for another version or cipher; locking it again"
            );
        }

        let descriptor = resolve_cipher(self.config.cipher())?;
        let key = self.read_key(descriptor.key_length)?;

        let iv = generate_iv();
        let ciphertext = encrypt(descriptor.algorithm, key.as_bytes(), &iv, &data)?;
        self.store
            .write(secrets, &envelope::seal(&header, &iv, &ciphertext))?;

        debug!(path = %secrets.display(), cipher = self.config.cipher(), "Locked");
        Ok(())
    }

    /// Decrypt the secrets file in place.
    ///
    /// # Preconditions
    /// - Secrets file exists
    /// - Key file exists
    /// - Content is decryptable under the active header
    /// - Key length matches the cipher
    ///
    /// # Errors
    /// - `MissingFile`, `AlreadyUnlocked`, `InvalidKeyLength`, `UnknownCipher`
    /// - `AmbiguousEnvelope` if the header occurs more than once
    /// - `MalformedEnvelope` if the payload is not `<hex>:<hex>`
    /// - `Crypto` if decryption fails (e.g. bad CBC padding)
    pub fn unlock(&self, secrets: &Path) -> Result<()> {
        self.require(FileRole::Secrets, secrets)?;
        self.require(FileRole::Key, self.config.key_path())?;

        let data = self.store.read(secrets)?;
        let header = self.config.header();
        let state = envelope::classify(&data, &header);
        debug!(store = self.store.name(), path = %secrets.display(), %state, "Checking lock state");

        if !envelope::is_decryptable(&data, &header) {
            return Err(match state {
                EnvelopeState::Ambiguous => Error::AmbiguousEnvelope {
                    occurrences: envelope::header_count(&data, &header),
                },
                _ => Error::AlreadyUnlocked,
            });
        }

        let key = self.read_key(required_key_length(self.config.cipher())?)?;
        let descriptor = resolve_cipher(self.config.cipher())?;

        let payload = envelope::open(&data, &header)?;
        let plaintext = decrypt(
            descriptor.algorithm,
            key.as_bytes(),
            &payload.iv,
            &payload.ciphertext,
        )?;
        self.store.write(secrets, &plaintext)?;

        debug!(path = %secrets.display(), cipher = self.config.cipher(), "Unlocked");
        Ok(())
    }

    /// Generate a new key file.
    ///
    /// The key length comes from the digits in the cipher name, so this does
    /// not require the cipher to be in the table.
    ///
    /// # Errors
    /// - `KeyExists` if the key file exists and `force` is false
    /// - `UnknownCipher` if the cipher name has no known bit size
    pub fn create_key(&self, force: bool) -> Result<()> {
        let key_path = self.config.key_path();
        if !force && self.store.exists(key_path) {
            return Err(Error::KeyExists(key_path.to_path_buf()));
        }

        let length = required_key_length(self.config.cipher())?;
        let key = KeyMaterial::generate(length);
        self.store.write(key_path, key.as_bytes())?;

        debug!(store = self.store.name(), path = %key_path.display(), length, force, "Key written");
        Ok(())
    }

    /// Replace the key while keeping the secrets file's lock state.
    ///
    /// A locked file is unlocked with the old key, the key is regenerated,
    /// and the file is locked again with the new key. A plaintext or absent
    /// file is left alone and only the key changes.
    ///
    /// The key is never rotated while the file holds ciphertext that could
    /// not be unlocked first, including ciphertext sealed under another
    /// version or cipher.
    ///
    /// # Errors
    /// - Any unlock error other than "already unlocked" or a missing secrets
    ///   file, before the key is touched
    /// - `ForeignEnvelope` if the file carries a header for another version
    ///   or cipher
    /// - `MissingFile` for the key if the secrets file is not plaintext
    /// - Errors from key creation or relocking; the file is then plaintext
    pub fn rekey(&self, secrets: &Path) -> Result<RekeyOutcome> {
        let was_locked = match self.unlock(secrets) {
            Ok(()) => true,
            Err(e) if e.is_missing(FileRole::Secrets) => false,
            Err(e) if matches!(e, Error::AlreadyUnlocked) || e.is_missing(FileRole::Key) => {
                self.ensure_plaintext(secrets, e)?;
                false
            }
            Err(e) => return Err(e),
        };
        debug!(path = %secrets.display(), was_locked, "Rotating key");

        self.create_key(true)?;

        if was_locked {
            self.lock(secrets)?;
            Ok(RekeyOutcome::Relocked)
        } else {
            Ok(RekeyOutcome::LeftUnlocked)
        }
    }

    /// Only plaintext with no chest header of any kind survives a rotation
    /// that did not unlock first. Otherwise `cause` (or `ForeignEnvelope`)
    /// is returned.
    fn ensure_plaintext(&self, secrets: &Path, cause: Error) -> Result<()> {
        let data = self.store.read(secrets)?;
        let header = self.config.header();
        if envelope::classify(&data, &header) != EnvelopeState::Plaintext {
            return Err(cause);
        }
        if let Some(tag) = envelope::foreign_tag(&data, &header) {
            return Err(Error::ForeignEnvelope { tag });
        }
        Ok(())
    }
}
