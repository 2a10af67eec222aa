//! Named byte-blob stores.
//!
//! The session never touches paths directly: a save directory, an image
//! folder and the recovery cache are all a [`BlobStore`] scoped to a root.
//! Entry names are flat file names; anything that would escape the root is
//! rejected.

mod fs;
mod memory;

use thiserror::Error;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Errors from blob store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No entry with this name exists.
    #[error("Not found: {name}")]
    NotFound {
        /// Name that was looked up
        name: String,
    },

    /// Name is empty or would leave the store root.
    #[error("Invalid entry name: {name:?}")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// I/O error from the backing filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this is the expected "nothing stored under that name" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// A flat, named byte-blob store.
pub trait BlobStore: Send {
    /// Human readable location for logs.
    fn describe(&self) -> String;

    /// Read an entry. Missing entries give [`StorageError::NotFound`].
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace an entry.
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove an entry. Returns false if it did not exist.
    fn remove(&mut self, name: &str) -> Result<bool, StorageError>;

    /// Names of all entries, sorted.
    fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Read an entry, mapping "not found" to `None`.
    fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.read(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check whether an entry exists.
    fn contains(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.read_optional(name)?.is_some())
    }
}

/// Reject names that are empty or contain path components.
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        Err(StorageError::InvalidName {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}
