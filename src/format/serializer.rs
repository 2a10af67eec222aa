//! Conversion between the in-memory session state and [`ExportDocument`].

use std::collections::HashSet;
use std::path::Path;

use crate::format::document::{DocumentMetadata, ExportDocument, ExportObject};
use crate::format::options::{ExportOptions, ExportResult, FormatWarning};
use crate::model::{Annotation, BBox, CategoryId, CategoryRegistry, SceneMetadata};

/// What an export document records about the image file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// File name of the image, e.g. `cat.png`.
    pub name: String,
    /// Pixel dimensions (width, height) if the image could be decoded.
    pub dimensions: Option<(u32, u32)>,
}

impl ImageInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: None,
        }
    }

    /// Set the image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Basename without extension.
    pub fn image_id(&self) -> String {
        image_stem(&self.name)
    }

    /// `"<width>x<height>"`, `"0x0"` when unknown.
    pub fn resolution(&self) -> String {
        let (width, height) = self.dimensions.unwrap_or((0, 0));
        format!("{width}x{height}")
    }
}

/// Basename of an image name without directories or extension.
pub fn image_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Store entry name of the export document for an image.
pub fn document_name(image_name: &str) -> String {
    format!("{}.json", image_stem(image_name))
}

/// Annotations, scene fields and category hints recovered from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDocument {
    pub annotations: Vec<Annotation>,
    pub scene: SceneMetadata,
    /// First `(label, category_id)` pair seen for every label, in document order.
    pub category_hints: Vec<(String, Option<CategoryId>)>,
}

impl ImportedDocument {
    /// Labels of the hints, in document order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.category_hints.iter().map(|(label, _)| label.as_str())
    }
}

/// Build the export document for the open image.
///
/// Annotations whose trimmed label is empty are left out and reported as
/// warnings. Category ids are looked up, never assigned: merge labels into
/// the registry before exporting.
pub fn export_document(
    annotations: &[Annotation],
    scene: &SceneMetadata,
    registry: &CategoryRegistry,
    image: &ImageInfo,
    options: &ExportOptions,
) -> (ExportDocument, ExportResult) {
    let mut result = ExportResult::new();
    let mut objects = Vec::with_capacity(annotations.len());

    for (index, ann) in annotations.iter().enumerate() {
        let label = ann.trimmed_label();
        if label.is_empty() {
            result.add_warning(
                FormatWarning::warning(format!(
                    "Annotation {} has an empty label and was not exported",
                    index + 1
                ))
                .with_image(&image.name),
            );
            continue;
        }

        let category_id = registry.get(label);
        if category_id.is_none() {
            result.add_warning(
                FormatWarning::info(format!("Label '{label}' has no category id yet"))
                    .with_image(&image.name),
            );
        }

        objects.push(ExportObject {
            id: objects.len() as u32 + 1,
            label: label.to_string(),
            category_id,
            bbox: ann.bbox.to_xywh(),
            description: ann.description.clone(),
            attributes: ann.attributes.clone(),
        });
    }

    if image.dimensions.is_none() {
        result.add_warning(
            FormatWarning::warning("Image dimensions unknown, resolution written as 0x0")
                .with_image(&image.name),
        );
    }

    result.annotations_exported = objects.len();

    let prefix = options.image_path_prefix.trim_end_matches('/');
    let image_path = if prefix.is_empty() {
        image.name.clone()
    } else {
        format!("{prefix}/{}", image.name)
    };

    let doc = ExportDocument {
        image_id: image.image_id(),
        image_path,
        scene_description: scene.scene_description.clone(),
        frame_theme: scene.frame_theme.clone(),
        background_theme: scene.background_theme.clone(),
        theme_match: scene.is_match,
        objects,
        metadata: DocumentMetadata {
            style: scene.style.clone(),
            source: scene.source.clone(),
            artist: scene.artist.clone(),
            resolution: image.resolution(),
        },
    };

    log::debug!(
        "Built export document for '{}' with {} objects ({} warnings)",
        image.name,
        result.annotations_exported,
        result.warnings.len()
    );

    (doc, result)
}

/// Convert a parsed document back into session state.
pub fn import_document(doc: &ExportDocument) -> ImportedDocument {
    let annotations = doc
        .objects
        .iter()
        .map(|object| {
            Annotation::new(object.label.trim(), BBox::from_xywh(object.bbox))
                .with_description(object.description.clone())
                .with_attributes(object.attributes.clone())
        })
        .collect();

    let mut seen = HashSet::new();
    let category_hints = doc
        .objects
        .iter()
        .map(|object| (object.label.trim(), object.category_id))
        .filter(|(label, _)| !label.is_empty() && seen.insert(*label))
        .map(|(label, id)| (label.to_string(), id))
        .collect();

    let scene = SceneMetadata {
        scene_description: doc.scene_description.clone(),
        frame_theme: doc.frame_theme.clone(),
        background_theme: doc.background_theme.clone(),
        is_match: doc.theme_match,
        style: doc.metadata.style.clone(),
        source: doc.metadata.source.clone(),
        artist: doc.metadata.artist.clone(),
    };

    ImportedDocument {
        annotations,
        scene,
        category_hints,
    }
}
