//! Vault engine for chest.
//!
//! This module provides:
//! - Per-invocation configuration
//! - The `$CHEST` envelope format and lock-state detection
//! - Lock, unlock, key creation and rekey transitions
//!
//! # Concurrency
//! Operations are synchronous and assume exclusive use of the key file and
//! the secrets file for their duration. Nothing prevents two processes from
//! racing on the same files.

pub mod config;
pub mod engine;
pub mod envelope;
pub mod status;

pub use config::{
    default_secrets_path, VaultConfig, DEFAULT_CIPHER, DEFAULT_KEY_FILENAME,
    DEFAULT_SECRETS_FILENAME, FORMAT_VERSION,
};
pub use engine::{RekeyOutcome, VaultEngine};
pub use envelope::{is_decryptable, is_encryptable, EnvelopeState, Header, HEADER_PREFIX};
pub use status::StatusReport;
