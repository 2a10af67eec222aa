//! Annotation record and the box-drawing gesture.

use serde::{Deserialize, Serialize};

use crate::model::geometry::{BBox, Point, is_drag};

/// A labelled box on the currently open image.
///
/// The serialized shape (`label`, `box`, `description`, `attributes`) is the
/// one used by recovery snapshots; export documents use their own schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Display label. Trimmed on edit; empty labels are never exported.
    pub label: String,
    /// Canonical box in image coordinates.
    #[serde(rename = "box")]
    pub bbox: BBox,
    /// Free text description.
    #[serde(default)]
    pub description: String,
    /// Trimmed, non-empty attribute strings.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Annotation {
    /// Create an annotation with empty description and attributes.
    pub fn new(label: impl Into<String>, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            description: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Label with surrounding whitespace removed.
    pub fn trimmed_label(&self) -> &str {
        self.label.trim()
    }

    /// Attributes as shown in the comma separated edit field.
    pub fn attributes_text(&self) -> String {
        self.attributes.join(", ")
    }
}

/// Split a comma separated edit field into trimmed, non-empty attributes.
pub fn parse_attributes(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// How a finished pointer gesture should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// Pointer travelled past the threshold: draw this box.
    Draw(BBox),
    /// Pointer stayed put: treat as a click at this point.
    Click(Point),
}

/// State for a pointer gesture in progress.
#[derive(Debug, Clone, Default)]
pub enum DrawingState {
    /// Not currently pressing.
    #[default]
    Idle,
    /// Pointer is down; stores where it went down and where it is now.
    Pressed { start: Point, current: Point },
}

impl DrawingState {
    /// Check if a gesture is in progress.
    pub fn is_pressed(&self) -> bool {
        matches!(self, DrawingState::Pressed { .. })
    }

    /// Start a gesture.
    pub fn press(&mut self, point: Point) {
        *self = DrawingState::Pressed {
            start: point,
            current: point,
        };
    }

    /// Track pointer movement while pressed.
    pub fn drag_to(&mut self, point: Point) {
        if let DrawingState::Pressed { current, .. } = self {
            *current = point;
        }
    }

    /// Preview box for rendering while dragging. May be degenerate.
    pub fn preview(&self) -> Option<BBox> {
        match self {
            DrawingState::Idle => None,
            DrawingState::Pressed { start, current } => Some(BBox::from_corners(*start, *current)),
        }
    }

    /// Finish the gesture at `end` and decide between drag and click.
    pub fn release(&mut self, end: Point, threshold: f32) -> Option<GestureOutcome> {
        let DrawingState::Pressed { start, .. } = std::mem::take(self) else {
            return None;
        };
        if is_drag(start, end, threshold) {
            Some(GestureOutcome::Draw(BBox::from_corners(start, end)))
        } else {
            Some(GestureOutcome::Click(end))
        }
    }

    /// Drop the gesture without an outcome.
    pub fn cancel(&mut self) {
        *self = DrawingState::Idle;
    }
}
