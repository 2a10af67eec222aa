//! Annotation document import/export.
//!
//! Every image gets its own COCO-like JSON document (see [`ExportDocument`]),
//! while category ids live in a single `category_map.json` shared by all
//! documents in a save directory. The serializer only converts between the
//! in-memory state and the document; reading and writing bytes is left to
//! [`crate::storage`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scene_annotator::format::{export_document, ExportOptions, ImageInfo};
//!
//! let image = ImageInfo::new("cat.png").with_dimensions(640, 480);
//! let (doc, result) = export_document(&annotations, &scene, &registry, &image, &ExportOptions::default());
//! let bytes = doc.to_json_vec()?;
//! ```

mod document;
mod error;
mod options;
mod serializer;

#[cfg(test)]
mod tests;

pub use document::{DocumentMetadata, ExportDocument, ExportObject};
pub(crate) use document::deserialize_flag;
pub use error::FormatError;
pub use options::{ExportOptions, ExportResult, FormatWarning, ImportOptions, WarningSeverity};
pub use serializer::{
    ImageInfo, ImportedDocument, document_name, export_document, image_stem, import_document,
};
