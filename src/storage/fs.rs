//! Directory-backed blob store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::{BlobStore, StorageError, validate_name};

/// Blob store over the files of a single directory (non-recursive).
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Use an existing directory as the store root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StorageError::NotFound {
                name: root.to_string_lossy().to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Use a directory as the store root, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl BlobStore for FsStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(name)?;
        std::fs::write(&path, bytes)?;
        log::trace!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StorageError> {
        let path = self.path_of(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::open(dir.path()).unwrap();

        store.write("b.json", b"{}").unwrap();
        store.write("a.json", b"[]").unwrap();
        assert_eq!(store.read("a.json").unwrap(), b"[]");
        assert_eq!(store.list().unwrap(), vec!["a.json", "b.json"]);

        assert!(store.remove("a.json").unwrap());
        assert!(!store.remove("a.json").unwrap());
        assert!(store.read("a.json").unwrap_err().is_not_found());
        assert_eq!(store.read_optional("a.json").unwrap(), None);
    }

    #[test]
    fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("cat.png"), b"png").unwrap();

        let store = FsStore::open(dir.path()).unwrap();
        assert_eq!(store.list().unwrap(), vec!["cat.png"]);
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.write("../evil.json", b"{}"),
            Err(StorageError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_open_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsStore::open(dir.path().join("missing")).is_err());
        let created = FsStore::create(dir.path().join("missing")).unwrap();
        assert!(created.root().is_dir());
    }
}
