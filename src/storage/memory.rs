//! In-memory blob store.

use std::collections::BTreeMap;

use crate::storage::{BlobStore, StorageError, validate_name};

/// Blob store kept entirely in memory.
///
/// Backs ad-hoc single images and stands in for directories in tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    label: String,
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            label: "memory".to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Name shown in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add an entry while building the store.
    pub fn with_entry(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.into(), bytes.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryStore {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        validate_name(name)?;
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        validate_name(name)?;
        self.entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StorageError> {
        validate_name(name)?;
        Ok(self.entries.remove(name).is_some())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basics() {
        let mut store = MemoryStore::new().with_entry("z.png", b"z".to_vec());
        store.write("a.json", b"{}").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a.json", "z.png"]);
        assert!(store.contains("z.png").unwrap());
        assert!(store.read("missing").unwrap_err().is_not_found());
        assert!(store.remove("z.png").unwrap());
        assert_eq!(store.len(), 1);
    }
}
