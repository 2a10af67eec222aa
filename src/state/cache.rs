//! Per-image recovery cache.
//!
//! Holds the unsaved work of every image that was touched since its last
//! durable export, one entry per image named `<image name>.json`. Entries
//! never carry category ids; those only live in the category map.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::deserialize_flag;
use crate::model::{Annotation, SceneMetadata};
use crate::storage::{BlobStore, StorageError};

/// Errors from the recovery cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store failed
    #[error("Recovery store error: {0}")]
    Storage(#[from] StorageError),

    /// Entry exists but cannot be decoded
    #[error("Malformed recovery entry for '{image}': {source}")]
    Malformed {
        /// Image the entry belongs to
        image: String,
        source: serde_json::Error,
    },

    /// Snapshot could not be encoded
    #[error("Failed to encode recovery entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Unsaved state of one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub annotations: Vec<Annotation>,
    pub scene: SceneMetadata,
    /// Selected annotation index at the time of the snapshot. Not trusted on
    /// restore; the store validates it against the restored list.
    pub selected: Option<usize>,
}

/// Wire layout of a recovery entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    annotations: Vec<Annotation>,
    #[serde(default)]
    scene_description: String,
    #[serde(default)]
    frame_theme: String,
    #[serde(default)]
    background_theme: String,
    #[serde(default = "default_is_match", deserialize_with = "deserialize_flag")]
    is_match: bool,
    #[serde(default)]
    style: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    selected_annotation: Option<usize>,
}

fn default_is_match() -> bool {
    true
}

impl From<&SessionSnapshot> for CacheEntry {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let scene = &snapshot.scene;
        Self {
            annotations: snapshot.annotations.clone(),
            scene_description: scene.scene_description.clone(),
            frame_theme: scene.frame_theme.clone(),
            background_theme: scene.background_theme.clone(),
            is_match: scene.is_match,
            style: scene.style.clone(),
            source: scene.source.clone(),
            artist: scene.artist.clone(),
            selected_annotation: snapshot.selected,
        }
    }
}

impl From<CacheEntry> for SessionSnapshot {
    fn from(entry: CacheEntry) -> Self {
        Self {
            annotations: entry.annotations,
            scene: SceneMetadata {
                scene_description: entry.scene_description,
                frame_theme: entry.frame_theme,
                background_theme: entry.background_theme,
                is_match: entry.is_match,
                style: entry.style,
                source: entry.source,
                artist: entry.artist,
            },
            selected: entry.selected_annotation,
        }
    }
}

/// Name of the recovery entry for an image.
pub fn entry_name(image: &str) -> String {
    format!("{image}.json")
}

/// Recovery snapshots keyed by image name.
pub struct SessionCache {
    store: Box<dyn BlobStore>,
}

impl SessionCache {
    pub fn new(store: Box<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Location of the backing store, for logs.
    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// Store the snapshot for `image`, replacing any previous one.
    pub fn save(&mut self, image: &str, snapshot: &SessionSnapshot) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(&CacheEntry::from(snapshot))?;
        self.store.write(&entry_name(image), &bytes)?;
        log::trace!(
            "Cached {} annotations for '{}'",
            snapshot.annotations.len(),
            image
        );
        Ok(())
    }

    /// Snapshot for `image`, if one was saved.
    pub fn load(&self, image: &str) -> Result<Option<SessionSnapshot>, CacheError> {
        let Some(bytes) = self.store.read_optional(&entry_name(image))? else {
            return Ok(None);
        };
        let entry: CacheEntry =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Malformed {
                image: image.to_string(),
                source,
            })?;
        Ok(Some(entry.into()))
    }

    /// Whether a snapshot exists for `image`.
    pub fn contains(&self, image: &str) -> Result<bool, CacheError> {
        Ok(self.store.contains(&entry_name(image))?)
    }

    /// Drop the snapshot for `image`. Returns false if there was none.
    pub fn clear(&mut self, image: &str) -> Result<bool, CacheError> {
        Ok(self.store.remove(&entry_name(image))?)
    }

    /// Drop every snapshot. Returns how many were removed.
    pub fn clear_all(&mut self) -> Result<usize, CacheError> {
        let names = self.store.list()?;
        let mut removed = 0;
        for name in names.iter().filter(|name| name.ends_with(".json")) {
            if self.store.remove(name)? {
                removed += 1;
            }
        }
        log::info!(
            "Cleared {} recovery entries from {}",
            removed,
            self.store.describe()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;
    use crate::storage::MemoryStore;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            annotations: vec![
                Annotation::new("cat", BBox::from([10.0, 10.0, 50.0, 40.0]))
                    .with_description("sleeping")
                    .with_attributes(vec!["orange".to_string()]),
            ],
            scene: SceneMetadata {
                scene_description: "A cat".to_string(),
                is_match: false,
                artist: "Someone".to_string(),
                ..SceneMetadata::default()
            },
            selected: Some(0),
        }
    }

    #[test]
    fn test_save_then_load() {
        let mut cache = SessionCache::new(Box::new(MemoryStore::new()));
        assert_eq!(cache.load("cat.png").unwrap(), None);

        cache.save("cat.png", &snapshot()).unwrap();
        assert!(cache.contains("cat.png").unwrap());
        assert_eq!(cache.load("cat.png").unwrap(), Some(snapshot()));
        assert_eq!(cache.load("dog.png").unwrap(), None);
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut cache = SessionCache::new(Box::new(MemoryStore::new()));
        cache.save("cat.png", &snapshot()).unwrap();
        let first = cache.store.read("cat.png.json").unwrap();
        cache.save("cat.png", &snapshot()).unwrap();

        assert_eq!(cache.store.read("cat.png.json").unwrap(), first);
        assert_eq!(cache.store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_wire_layout() {
        let mut cache = SessionCache::new(Box::new(MemoryStore::new()));
        cache.save("cat.png", &snapshot()).unwrap();
        let bytes = cache.store.read("cat.png.json").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["sceneDescription"], "A cat");
        assert_eq!(value["isMatch"], false);
        assert_eq!(value["selectedAnnotation"], 0);
        assert_eq!(value["annotations"][0]["box"], serde_json::json!([10.0, 10.0, 50.0, 40.0]));
        assert!(value["annotations"][0].get("category_id").is_none());
    }

    #[test]
    fn test_lenient_entry_fields() {
        let store = MemoryStore::new().with_entry(
            "cat.png.json",
            br#"{"annotations": [], "isMatch": "false"}"#.to_vec(),
        );
        let cache = SessionCache::new(Box::new(store));
        let restored = cache.load("cat.png").unwrap().unwrap();

        assert!(!restored.scene.is_match);
        assert_eq!(restored.selected, None);
        assert!(restored.annotations.is_empty());
    }

    #[test]
    fn test_malformed_entry() {
        let store = MemoryStore::new().with_entry("cat.png.json", b"{not json".to_vec());
        let cache = SessionCache::new(Box::new(store));
        assert!(matches!(
            cache.load("cat.png"),
            Err(CacheError::Malformed { .. })
        ));
    }

    #[test]
    fn test_clear_and_clear_all() {
        let mut cache = SessionCache::new(Box::new(MemoryStore::new()));
        cache.save("a.png", &snapshot()).unwrap();
        cache.save("b.png", &snapshot()).unwrap();
        cache.save("c.png", &snapshot()).unwrap();

        assert!(cache.clear("a.png").unwrap());
        assert!(!cache.clear("a.png").unwrap());
        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(cache.load("b.png").unwrap(), None);
    }
}
