//! Read-only summary of a vault's files.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::engine::VaultEngine;
use crate::envelope::{self, EnvelopeState};
use chest_common::Result;
use chest_crypto::{required_key_length, resolve_cipher, validate_key_length};
use chest_storage::FileStore;

/// What `status` reports. Never includes key bytes or file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub secrets_path: PathBuf,
    /// `None` when the secrets file does not exist.
    pub state: Option<EnvelopeState>,
    pub header: String,
    /// A chest header for another version or cipher found in the file.
    pub foreign_header: Option<String>,
    pub cipher: String,
    /// `None` when the cipher is not in the table.
    pub algorithm: Option<&'static str>,
    /// `None` when the cipher name has no known bit size.
    pub required_key_length: Option<usize>,
    pub key_path: PathBuf,
    pub key_present: bool,
    pub key_length_valid: bool,
}

impl<S: FileStore> VaultEngine<S> {
    /// Inspect both files without modifying either.
    ///
    /// # Errors
    /// - `Io` if an existing file cannot be read
    pub fn status(&self, secrets: &Path) -> Result<StatusReport> {
        let config = self.config();
        let store = self.store();

        let header = config.header();
        let (state, foreign_header) = if store.exists(secrets) {
            (
                Some(self.state(secrets)?),
                envelope::foreign_tag(&store.read(secrets)?, &header),
            )
        } else {
            (None, None)
        };

        let required = required_key_length(config.cipher()).ok();
        let key_present = store.exists(config.key_path());
        let key_length_valid = match (key_present, required) {
            (true, Some(required)) => validate_key_length(&store.read(config.key_path())?, required),
            _ => false,
        };

        Ok(StatusReport {
            secrets_path: secrets.to_path_buf(),
            state,
            header: header.as_str().trim_end().to_string(),
            foreign_header,
            cipher: config.cipher().to_string(),
            algorithm: resolve_cipher(config.cipher()).ok().map(|d| d.algorithm.id()),
            required_key_length: required,
            key_path: config.key_path().to_path_buf(),
            key_present,
            key_length_valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use chest_storage::MemoryStore;

    #[test]
    fn test_status_of_empty_vault() {
        let engine = VaultEngine::with_store(
            VaultConfig::new("/k", "AES_256_CBC", "1.0.0"),
            MemoryStore::new(),
        );
        let report = engine.status(Path::new("/c")).unwrap();

        assert_eq!(report.state, None);
        assert_eq!(report.header, "$CHEST:1.0.0:AES_256_CBC;");
        assert_eq!(report.algorithm, Some("aes-256-cbc"));
        assert_eq!(report.required_key_length, Some(32));
        assert!(!report.key_present);
        assert!(!report.key_length_valid);
    }

    #[test]
    fn test_status_tracks_lock_state() {
        let engine = VaultEngine::with_store(
            VaultConfig::new("/k", "AES_128_CTR", "1"),
            MemoryStore::new(),
        );
        let chest = Path::new("/c");
        engine.create_key(false).unwrap();
        engine.store().write(chest, b"secret").unwrap();

        let report = engine.status(chest).unwrap();
        assert_eq!(report.state, Some(EnvelopeState::Plaintext));
        assert!(report.key_present);
        assert!(report.key_length_valid);

        engine.lock(chest).unwrap();
        let report = engine.status(chest).unwrap();
        assert_eq!(report.state, Some(EnvelopeState::Encrypted));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "locked");
        assert_eq!(json["required_key_length"], 16);
    }

    #[test]
    fn test_status_unknown_cipher() {
        let engine = VaultEngine::with_store(
            VaultConfig::new("/k", "BLOWFISH", "1"),
            MemoryStore::new(),
        );
        let report = engine.status(Path::new("/c")).unwrap();
        assert_eq!(report.algorithm, None);
        assert_eq!(report.required_key_length, None);
    }

    #[test]
    fn test_status_reports_foreign_header() {
        let store = MemoryStore::new();
        let chest = Path::new("/c");
        let ctr = VaultEngine::with_store(VaultConfig::new("/k", "AES_256_CTR", "1"), &store);
        ctr.create_key(false).unwrap();
        store.write(chest, b"secret").unwrap();
        ctr.lock(chest).unwrap();

        let cbc = VaultEngine::with_store(VaultConfig::new("/k", "AES_256_CBC", "1"), &store);
        let report = cbc.status(chest).unwrap();
        assert_eq!(report.state, Some(EnvelopeState::Plaintext));
        assert_eq!(report.foreign_header.as_deref(), Some("$CHEST:1:AES_256_CTR;"));

        assert_eq!(ctr.status(chest).unwrap().foreign_header, None);
    }
}
