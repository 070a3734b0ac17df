//! Error taxonomy for chest operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::FileRole;

/// Top-level error type for chest operations.
///
/// Every variant except `Crypto`, `MalformedEnvelope` and `Io` is raised by
/// a precondition check, before anything is written to disk.
#[derive(Debug, Error)]
pub enum Error {
    /// The secrets file or the key file does not exist.
    #[error("Missing or invalid {role}: {}", .path.display())]
    MissingFile { role: FileRole, path: PathBuf },

    /// The secrets file already carries the active header.
    #[error("The chest file is already locked")]
    AlreadyLocked,

    /// The secrets file does not carry the active header.
    #[error("The chest file is already unlocked")]
    AlreadyUnlocked,

    /// The active header occurs more than once in the secrets file.
    #[error("The chest file contains the header {occurrences} times and cannot be unlocked")]
    AmbiguousEnvelope { occurrences: usize },

    /// The secrets file carries a chest header for another version or cipher.
    #[error("The chest file is locked under another header: {tag}")]
    ForeignEnvelope { tag: String },

    /// The cipher name is not in the cipher table.
    #[error("Invalid cipher: {0}")]
    UnknownCipher(String),

    /// The key file length does not match what the cipher requires.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// `create` refused to overwrite an existing key.
    #[error("A chest key already exists: {}", .0.display())]
    KeyExists(PathBuf),

    /// Cipher initialization, padding or IV failure.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// The encrypted payload could not be parsed.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error reports a missing file of the given role.
    pub fn is_missing(&self, role: FileRole) -> bool {
        matches!(self, Error::MissingFile { role: r, .. } if *r == role)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
