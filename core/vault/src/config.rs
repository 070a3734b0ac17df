//! Per-invocation vault configuration.

use std::path::{Path, PathBuf};

use crate::envelope::Header;

/// Default key file name, created next to the secrets file.
pub const DEFAULT_KEY_FILENAME: &str = ".chest_key";

/// Default secrets file name.
pub const DEFAULT_SECRETS_FILENAME: &str = ".chest";

/// Cipher used when none is given.
pub const DEFAULT_CIPHER: &str = "AES_256_CBC";

/// Format version written into headers.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Immutable configuration for one vault operation.
///
/// Nothing here is validated on construction: an unknown cipher name is only
/// reported by the operation that needs to resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    key_path: PathBuf,
    cipher: String,
    version: String,
}

impl VaultConfig {
    /// Create a configuration. An empty cipher name falls back to
    /// [`DEFAULT_CIPHER`].
    pub fn new(
        key_path: impl Into<PathBuf>,
        cipher: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let cipher = cipher.into();
        Self {
            key_path: key_path.into(),
            cipher: if cipher.is_empty() {
                DEFAULT_CIPHER.to_string()
            } else {
                cipher
            },
            version: version.into(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn cipher(&self) -> &str {
        &self.cipher
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The header that marks a file as locked under this configuration.
    pub fn header(&self) -> Header {
        Header::new(&self.version, &self.cipher)
    }
}

/// Default secrets path for a working directory.
pub fn default_secrets_path(dir: &Path) -> PathBuf {
    dir.join(DEFAULT_SECRETS_FILENAME)
}
