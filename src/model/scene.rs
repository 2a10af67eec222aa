//! Whole-image descriptive fields.

/// Free-form description of the open image as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneMetadata {
    pub scene_description: String,
    pub frame_theme: String,
    pub background_theme: String,
    /// Whether the frame and background themes match.
    pub is_match: bool,
    pub style: String,
    pub source: String,
    pub artist: String,
}

impl Default for SceneMetadata {
    fn default() -> Self {
        Self {
            scene_description: String::new(),
            frame_theme: String::new(),
            background_theme: String::new(),
            is_match: true,
            style: String::new(),
            source: String::new(),
            artist: String::new(),
        }
    }
}
