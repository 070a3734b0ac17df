//! Byte-level file storage for chest.
//!
//! The vault engine never touches the filesystem directly. It reads and
//! writes the key file and the secrets file through a [`FileStore`], which
//! keeps the engine testable against [`MemoryStore`] and lets [`LocalStore`]
//! own the details of replacing a file in place.

pub mod local;
pub mod memory;
pub mod provider;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use provider::FileStore;
