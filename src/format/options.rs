//! Options and reports shared by export and import.

use crate::constants::DEFAULT_IMAGE_PATH_PREFIX;

/// Options for export operations.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory prefix for the `image_path` field.
    pub image_path_prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            image_path_prefix: DEFAULT_IMAGE_PATH_PREFIX.to_string(),
        }
    }
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory prefix for `image_path`.
    pub fn image_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_path_prefix = prefix.into();
        self
    }
}

/// Options for import operations.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Merge the document's labels into the existing category registry.
    /// When false the document declares a fresh registry.
    pub merge: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { merge: true }
    }
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set merge mode (true = merge with existing registry, false = replace).
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of annotations written to the document.
    pub annotations_exported: usize,

    /// Warnings generated during export (e.g., dropped annotations).
    pub warnings: Vec<FormatWarning>,

    /// Store entries written by the save.
    pub files_created: Vec<String>,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Non-fatal problem found while converting data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWarning {
    /// Image this warning relates to (if applicable).
    pub image: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            image: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the image this warning relates to.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

impl std::fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.image {
            Some(image) => write!(f, "[{image}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was skipped or modified.
    Warning,
}
