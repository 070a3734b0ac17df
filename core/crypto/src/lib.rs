//! Cryptographic primitives for chest.
//!
//! This module provides:
//! - The static cipher table and the key length rules derived from it
//! - AES in CBC, CTR, OFB and CFB modes with a caller-supplied IV
//! - Key generation with automatic zeroization
//!
//! # Security
//! - Key material is zeroized on drop and never logged
//! - The modes here are unauthenticated; tampering is not detected

pub mod table;
pub mod keys;
pub mod modes;

pub use table::{
    check_key_length, extract_bit_size, key_length_for_bits, required_key_length, resolve_cipher,
    validate_key_length, Algorithm, CipherDescriptor, CipherName, CipherTable, KeySize, Mode,
    IV_LENGTH,
};
pub use keys::KeyMaterial;
pub use modes::{decrypt, encrypt, generate_iv};
