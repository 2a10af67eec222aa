//! On-disk export document.
//!
//! One document per image, named `<image-basename>.json`. The layout is
//! COCO-like: boxes are `[x, y, width, height]` and every object carries the
//! category id looked up from the shared category map.

use serde::{Deserialize, Deserializer, Serialize};

use crate::format::error::FormatError;
use crate::model::CategoryId;

/// Per-image annotation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Image basename without extension.
    #[serde(default)]
    pub image_id: String,

    /// Image path relative to the dataset root, e.g. `data/images/cat.png`.
    #[serde(default)]
    pub image_path: String,

    #[serde(default)]
    pub scene_description: String,

    #[serde(default)]
    pub frame_theme: String,

    #[serde(default)]
    pub background_theme: String,

    #[serde(default = "default_theme_match", deserialize_with = "deserialize_flag")]
    pub theme_match: bool,

    /// Exported annotations.
    pub objects: Vec<ExportObject>,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl ExportDocument {
    /// Parse a document, rejecting it wholesale if anything is malformed.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, FormatError> {
        let doc: Self = serde_json::from_slice(bytes)?;
        for object in &doc.objects {
            if object.bbox[2] < 0.0 || object.bbox[3] < 0.0 {
                return Err(FormatError::invalid_coordinates(format!(
                    "object {} has negative width or height",
                    object.id
                )));
            }
        }
        Ok(doc)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, FormatError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// One exported annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportObject {
    /// 1-based position among exported objects.
    pub id: u32,

    pub label: String,

    /// Absent when the label was never merged into the category map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// `[x, y, width, height]`
    pub bbox: [f32; 4],

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub attributes: Vec<String>,
}

/// Descriptive fields about the artwork and the image file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub style: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub artist: String,

    /// `"<width>x<height>"`
    #[serde(default)]
    pub resolution: String,
}

fn default_theme_match() -> bool {
    true
}

/// Accept the flag as a boolean or as the strings `"true"` / `"false"`.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim() {
            "true" | "" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"true\" or \"false\", found {other:?}"
            ))),
        },
    }
}
