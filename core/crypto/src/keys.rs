//! Key material with secure memory handling.
//!
//! A chest key is stored as text: `required_len` lowercase hex characters.
//! The AES key is those characters' bytes exactly as they sit in the file,
//! so the stored length and the length check agree by construction.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::table::check_key_length;
use chest_common::Result;

/// Raw key bytes as read from or written to the key file.
///
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Wrap bytes read from a key file.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Generate a key of exactly `length` bytes.
    ///
    /// # Postconditions
    /// - `as_bytes().len() == length`
    /// - Every byte is an ASCII hex digit
    pub fn generate(length: usize) -> Self {
        let mut random = Zeroizing::new(vec![0u8; length.div_ceil(2)]);
        OsRng.fill_bytes(&mut random);

        let mut encoded = hex::encode(random.as_slice()).into_bytes();
        encoded.truncate(length);
        Self { bytes: encoded }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the key against a cipher's required length.
    ///
    /// # Errors
    /// - `InvalidKeyLength` on any mismatch
    pub fn validate(&self, required: usize) -> Result<()> {
        check_key_length(&self.bytes, required)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {} bytes])", self.bytes.len())
    }
}
