//! Tests for export and import conversion.

use crate::format::{
    ExportOptions, ImageInfo, WarningSeverity, document_name, export_document, image_stem,
    import_document,
};
use crate::model::{Annotation, BBox, CategoryRegistry, SceneMetadata};

fn image() -> ImageInfo {
    ImageInfo::new("cat.png").with_dimensions(640, 480)
}

#[test]
fn test_drawn_box_exports_as_xywh() {
    let annotations = vec![Annotation::new("cat", BBox::from([10.0, 10.0, 50.0, 40.0]))];
    let mut registry = CategoryRegistry::new();
    registry.merge(["cat"]);

    let (doc, result) = export_document(
        &annotations,
        &SceneMetadata::default(),
        &registry,
        &image(),
        &ExportOptions::default(),
    );

    assert_eq!(doc.objects.len(), 1);
    assert_eq!(doc.objects[0].bbox, [10.0, 10.0, 40.0, 30.0]);
    assert_eq!(doc.objects[0].id, 1);
    assert_eq!(doc.objects[0].category_id, Some(1));
    assert_eq!(result.annotations_exported, 1);
    assert!(!result.has_warnings());
}

#[test]
fn test_whitespace_label_is_excluded() {
    let annotations = vec![
        Annotation::new("  ", BBox::from([0.0, 0.0, 5.0, 5.0])),
        Annotation::new(" dog ", BBox::from([1.0, 1.0, 9.0, 9.0])),
    ];
    let mut registry = CategoryRegistry::new();
    registry.merge(["dog"]);

    let (doc, result) = export_document(
        &annotations,
        &SceneMetadata::default(),
        &registry,
        &image(),
        &ExportOptions::default(),
    );

    assert_eq!(doc.objects.len(), 1);
    assert_eq!(doc.objects[0].label, "dog");
    assert_eq!(doc.objects[0].id, 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].severity, WarningSeverity::Warning);
    assert_eq!(result.warnings[0].image.as_deref(), Some("cat.png"));
}

#[test]
fn test_unmerged_label_has_no_category_id() {
    let annotations = vec![Annotation::new("owl", BBox::from([0.0, 0.0, 5.0, 5.0]))];

    let (doc, result) = export_document(
        &annotations,
        &SceneMetadata::default(),
        &CategoryRegistry::new(),
        &image(),
        &ExportOptions::default(),
    );

    assert_eq!(doc.objects[0].category_id, None);
    assert_eq!(result.warnings[0].severity, WarningSeverity::Info);
    let json = String::from_utf8(doc.to_json_vec().unwrap()).unwrap();
    assert!(!json.contains("category_id"));
}

#[test]
fn test_document_identity_fields() {
    let scene = SceneMetadata {
        style: "ukiyo-e".into(),
        artist: "Hokusai".into(),
        is_match: false,
        ..SceneMetadata::default()
    };

    let (doc, _) = export_document(
        &[],
        &scene,
        &CategoryRegistry::new(),
        &image(),
        &ExportOptions::default(),
    );

    assert_eq!(doc.image_id, "cat");
    assert_eq!(doc.image_path, "data/images/cat.png");
    assert_eq!(doc.metadata.resolution, "640x480");
    assert_eq!(doc.metadata.style, "ukiyo-e");
    assert_eq!(doc.metadata.artist, "Hokusai");
    assert!(!doc.theme_match);
    assert!(doc.objects.is_empty());
}

#[test]
fn test_custom_image_path_prefix() {
    let options = ExportOptions::new().image_path_prefix("dataset/raw/");
    let (doc, _) = export_document(
        &[],
        &SceneMetadata::default(),
        &CategoryRegistry::new(),
        &image(),
        &options,
    );
    assert_eq!(doc.image_path, "dataset/raw/cat.png");
}

#[test]
fn test_unknown_dimensions_warn() {
    let (doc, result) = export_document(
        &[],
        &SceneMetadata::default(),
        &CategoryRegistry::new(),
        &ImageInfo::new("broken.jpg"),
        &ExportOptions::default(),
    );
    assert_eq!(doc.metadata.resolution, "0x0");
    assert!(result.has_warnings());
    assert_eq!(result.warnings[0].severity, WarningSeverity::Warning);
}

#[test]
fn test_import_category_hints_first_wins() {
    let annotations = vec![
        Annotation::new("cat", BBox::from([0.0, 0.0, 5.0, 5.0])),
        Annotation::new("dog", BBox::from([0.0, 0.0, 6.0, 6.0])),
        Annotation::new("cat", BBox::from([0.0, 0.0, 7.0, 7.0])),
    ];
    let mut registry = CategoryRegistry::new();
    registry.merge(["cat", "dog"]);

    let (doc, _) = export_document(
        &annotations,
        &SceneMetadata::default(),
        &registry,
        &image(),
        &ExportOptions::default(),
    );
    let imported = import_document(&doc);

    assert_eq!(
        imported.category_hints,
        vec![("cat".to_string(), Some(1)), ("dog".to_string(), Some(2))]
    );
    assert_eq!(imported.labels().collect::<Vec<_>>(), vec!["cat", "dog"]);
    assert_eq!(imported.annotations.len(), 3);
}

#[test]
fn test_names() {
    assert_eq!(image_stem("photo.final.jpg"), "photo.final");
    assert_eq!(image_stem("nested/dir/cat.png"), "cat");
    assert_eq!(document_name("cat.png"), "cat.json");
    assert_eq!(document_name("README"), "README.json");
}
