//! Durable label to category id mapping shared by every image in a save directory.

use std::collections::{BTreeMap, HashSet};

use crate::format::{FormatError, FormatWarning};

/// Category id assigned to a label. Positive, 1-based.
pub type CategoryId = u32;

/// Maps labels to stable category ids.
///
/// Ids are handed out as `max(existing) + 1` and an assigned id never
/// changes for the lifetime of the registry. Only [`CategoryRegistry::load`]
/// replaces the mapping wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    ids: BTreeMap<String, CategoryId>,
    max_id: CategoryId,
}

impl CategoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the id of a label.
    pub fn get(&self, label: &str) -> Option<CategoryId> {
        self.ids.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.ids.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Highest id handed out so far (0 when empty).
    pub fn max_id(&self) -> CategoryId {
        self.max_id
    }

    /// Add every unknown label in input order. Returns how many were added.
    ///
    /// Labels are trimmed first. Known labels keep their id, so merging the
    /// same labels twice is a no-op the second time. Empty labels are skipped,
    /// as are new labels once the id space is exhausted.
    pub fn merge<I, S>(&mut self, labels: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() || self.ids.contains_key(label) {
                continue;
            }
            let Some(id) = self.max_id.checked_add(1) else {
                log::warn!("No category id left for '{}' after {}", label, self.max_id);
                continue;
            };
            self.max_id = id;
            self.ids.insert(label.to_string(), id);
            log::debug!("Category '{}' assigned id {}", label, id);
            added += 1;
        }
        added
    }

    /// Replace the registry with the given entries.
    ///
    /// Entries without a usable id, with an empty label, or reusing an id or
    /// label that an earlier entry already claimed are dropped and reported.
    pub fn load<I>(&mut self, entries: I) -> Vec<FormatWarning>
    where
        I: IntoIterator<Item = (String, Option<CategoryId>)>,
    {
        let mut ids = BTreeMap::new();
        let mut used = HashSet::new();
        let mut warnings = Vec::new();

        for (label, id) in entries {
            if label.trim().is_empty() {
                warnings.push(FormatWarning::warning("Dropped category with empty label"));
                continue;
            }
            let Some(id) = id.filter(|id| *id > 0) else {
                warnings.push(FormatWarning::warning(format!(
                    "Dropped category '{label}': id is not a positive integer"
                )));
                continue;
            };
            if ids.contains_key(&label) {
                warnings.push(FormatWarning::warning(format!(
                    "Dropped duplicate category '{label}' (id {id})"
                )));
                continue;
            }
            if !used.insert(id) {
                warnings.push(FormatWarning::warning(format!(
                    "Dropped category '{label}': id {id} already in use"
                )));
                continue;
            }
            ids.insert(label, id);
        }

        self.max_id = ids.values().copied().max().unwrap_or(0);
        self.ids = ids;
        for warning in &warnings {
            log::warn!("{}", warning.message);
        }
        warnings
    }

    /// Plain label to id mapping for persistence.
    pub fn serialize(&self) -> BTreeMap<String, CategoryId> {
        self.ids.clone()
    }

    /// Iterate `(label, id)` pairs ordered by label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CategoryId)> {
        self.ids.iter().map(|(label, id)| (label.as_str(), *id))
    }

    /// Encode as the `category_map.json` document.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, FormatError> {
        Ok(serde_json::to_vec_pretty(&self.ids)?)
    }

    /// Decode a `category_map.json` document.
    ///
    /// Anything other than a JSON object is an error; inside the object, bad
    /// entries are dropped and reported while the rest are kept.
    pub fn from_json_slice(bytes: &[u8]) -> Result<(Self, Vec<FormatWarning>), FormatError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let serde_json::Value::Object(map) = value else {
            return Err(FormatError::invalid_format(
                "category map must be a JSON object of label to id",
            ));
        };

        let entries = map.into_iter().map(|(label, id)| {
            let id = id.as_u64().and_then(|n| CategoryId::try_from(n).ok());
            (label, id)
        });

        let mut registry = Self::new();
        let warnings = registry.load(entries);
        Ok((registry, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_assigns_sequential_ids() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.merge(["cat", "dog", "cat"]), 2);
        assert_eq!(registry.get("cat"), Some(1));
        assert_eq!(registry.get("dog"), Some(2));
        assert_eq!(registry.get("bird"), None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = CategoryRegistry::new();
        once.merge(["tree", "house", "sky"]);

        let mut twice = once.clone();
        assert_eq!(twice.merge(["tree", "house", "sky"]), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_never_reassigns() {
        let mut registry = CategoryRegistry::new();
        registry.merge(["b", "a"]);
        registry.merge(["c", "a", "b"]);
        assert_eq!(registry.get("b"), Some(1));
        assert_eq!(registry.get("a"), Some(2));
        assert_eq!(registry.get("c"), Some(3));
    }

    #[test]
    fn test_merge_continues_after_loaded_max() {
        let mut registry = CategoryRegistry::new();
        registry.load([("cat".to_string(), Some(1)), ("fox".to_string(), Some(7))]);
        registry.merge(["dog"]);
        assert_eq!(registry.get("dog"), Some(8));
    }

    #[test]
    fn test_merge_skips_empty_labels() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.merge(["", "   "]), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_merge_trims_labels() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.merge([" cat ", "cat", "dog\t"]), 2);
        assert_eq!(registry.get("cat"), Some(1));
        assert_eq!(registry.get("dog"), Some(2));
        assert_eq!(registry.get(" cat "), None);
    }

    #[test]
    fn test_merge_stops_at_exhausted_id_space() {
        let (mut registry, warnings) =
            CategoryRegistry::from_json_slice(br#"{"cat": 4294967295}"#).unwrap();
        assert!(warnings.is_empty());

        assert_eq!(registry.merge(["dog", "cat"]), 0);
        assert_eq!(registry.get("dog"), None);
        assert_eq!(registry.get("cat"), Some(CategoryId::MAX));
        assert_eq!(registry.max_id(), CategoryId::MAX);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_json_keeps_well_formed_entries() {
        let json = br#"{"cat": 1, "dog": "two", "eel": 1, "fox": 3, "gnu": -4, "hen": 2.5}"#;
        let (registry, warnings) = CategoryRegistry::from_json_slice(json).unwrap();

        assert_eq!(registry.get("cat"), Some(1));
        assert_eq!(registry.get("fox"), Some(3));
        assert_eq!(registry.len(), 2);
        assert_eq!(warnings.len(), 4);
        assert_eq!(registry.max_id(), 3);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(CategoryRegistry::from_json_slice(b"[1, 2]").is_err());
        assert!(CategoryRegistry::from_json_slice(b"not json").is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut registry = CategoryRegistry::new();
        registry.merge(["person", "car"]);
        let bytes = registry.to_json_vec().unwrap();
        let (loaded, warnings) = CategoryRegistry::from_json_slice(&bytes).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(loaded, registry);
    }
}
