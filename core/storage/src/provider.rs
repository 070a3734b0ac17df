//! Storage trait definition.

use std::path::Path;

use chest_common::Result;

/// Whole-file byte storage.
///
/// All operations are blocking. Implementations do not lock files against
/// other processes.
pub trait FileStore {
    /// Get the store name (e.g. "local", "memory").
    fn name(&self) -> &str;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the complete content of a file.
    ///
    /// # Errors
    /// - `Io` with `NotFound` if the file does not exist
    /// - Any other I/O error
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace the complete content of a file.
    ///
    /// # Postconditions
    /// - Readers see either the old content or `data`, never a mix
    /// - Missing parent directories are created
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

impl<S: FileStore + ?Sized> FileStore for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        (**self).write(path, data)
    }
}
