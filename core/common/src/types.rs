//! Small shared types.

use std::fmt;

/// Which of the two files an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// The secrets file being locked or unlocked.
    Secrets,
    /// The sibling key file.
    Key,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Secrets => write!(f, "chest file"),
            FileRole::Key => write!(f, "key file"),
        }
    }
}
