//! In-memory store for testing.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::provider::FileStore;
use chest_common::{Error, Result};

/// In-memory store.
///
/// Useful for testing. All data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FileStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                ))
            })
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_write_read() {
        let store = MemoryStore::new();
        let path = Path::new("/vault/.chest");

        assert!(!store.exists(path));
        store.write(path, b"Hello, Memory!").unwrap();
        assert!(store.exists(path));
        assert_eq!(store.read(path).unwrap(), b"Hello, Memory!");
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_memory_read_missing() {
        let store = MemoryStore::new();
        assert!(store.read(Path::new("/absent")).is_err());
    }

    #[test]
    fn test_memory_overwrite_counts_each_write() {
        let store = MemoryStore::new();
        let path = Path::new("/k");
        store.write(path, b"x").unwrap();
        store.write(path, b"yz").unwrap();
        assert_eq!(store.read(path).unwrap(), b"yz");
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.name(), "memory");
    }
}
