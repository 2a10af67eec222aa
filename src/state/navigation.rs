//! Ordering of opened images and the current position.

use crate::constants::IMAGE_EXTENSIONS;

/// Check if a filename (string) has a supported image extension.
/// Works with both full paths and just filenames.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Observable navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No image open.
    Empty,
    /// One ad-hoc image, no sequence to step through.
    Single,
    /// Position inside an opened folder.
    Sequence { index: usize, total: usize },
}

#[derive(Debug, Clone, Default)]
enum Mode {
    #[default]
    Empty,
    Single(String),
    Sequence { images: Vec<String>, index: usize },
}

/// Tracks which image is current.
///
/// The index is always in bounds: a sequence is never empty, and opening an
/// empty folder leaves the navigator in [`NavState::Empty`].
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    mode: Mode,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open one ad-hoc image.
    pub fn open_single(&mut self, name: impl Into<String>) {
        self.mode = Mode::Single(name.into());
    }

    /// Open an ordered list of images, starting at the first.
    ///
    /// Returns false (and becomes empty) if the list is empty.
    pub fn open_folder(&mut self, images: Vec<String>) -> bool {
        if images.is_empty() {
            self.mode = Mode::Empty;
            return false;
        }
        log::info!("Opened sequence of {} images", images.len());
        self.mode = Mode::Sequence { images, index: 0 };
        true
    }

    /// Forget every image.
    pub fn close(&mut self) {
        self.mode = Mode::Empty;
    }

    pub fn state(&self) -> NavState {
        match &self.mode {
            Mode::Empty => NavState::Empty,
            Mode::Single(_) => NavState::Single,
            Mode::Sequence { images, index } => NavState::Sequence {
                index: *index,
                total: images.len(),
            },
        }
    }

    /// Name of the current image.
    pub fn current(&self) -> Option<&str> {
        match &self.mode {
            Mode::Empty => None,
            Mode::Single(name) => Some(name),
            Mode::Sequence { images, index } => images.get(*index).map(String::as_str),
        }
    }

    /// Images of the open sequence (empty outside a sequence).
    pub fn images(&self) -> &[String] {
        match &self.mode {
            Mode::Sequence { images, .. } => images,
            _ => &[],
        }
    }

    /// Index `delta` steps away from the current one, if that is in bounds.
    pub fn target(&self, delta: isize) -> Option<usize> {
        let Mode::Sequence { images, index } = &self.mode else {
            return None;
        };
        let target = index.checked_add_signed(delta)?;
        (target < images.len()).then_some(target)
    }

    /// Name of the image at `index` in the sequence.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.images().get(index).map(String::as_str)
    }

    /// Jump to `index` in the sequence. Out of range is a no-op.
    pub fn go_to(&mut self, index: usize) -> bool {
        match &mut self.mode {
            Mode::Sequence { images, index: current } if index < images.len() => {
                *current = index;
                true
            }
            _ => false,
        }
    }

    /// Move by `delta` images. Outside a sequence or past either end this is
    /// a no-op returning false.
    pub fn step(&mut self, delta: isize) -> bool {
        match self.target(delta) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    /// Progress string like "3/15" (1-based). "1/1" for a single image,
    /// "0/0" when empty.
    pub fn progress(&self) -> String {
        match self.state() {
            NavState::Empty => "0/0".to_string(),
            NavState::Single => "1/1".to_string(),
            NavState::Sequence { index, total } => format!("{}/{}", index + 1, total),
        }
    }
}
