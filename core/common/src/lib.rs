//! Common types shared across the chest crates.
//!
//! Everything that can go wrong in a lock, unlock, create or rekey
//! transition is expressed as a variant of [`Error`], so callers can tell
//! *why* an operation was refused rather than just *that* it was.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::FileRole;
