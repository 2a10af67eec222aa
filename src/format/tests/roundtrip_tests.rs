//! Round-trip tests through export, JSON encoding and import.

use crate::format::{ExportDocument, ExportOptions, ImageInfo, export_document, import_document};
use crate::model::{Annotation, BBox, CategoryRegistry, SceneMetadata};

/// Create a session state using every annotation and scene field.
fn create_full_state() -> (Vec<Annotation>, SceneMetadata) {
    let annotations = vec![
        Annotation::new("cat", BBox::from([10.0, 10.0, 50.0, 40.0]))
            .with_description("a sleeping cat")
            .with_attributes(vec!["orange".into(), "fluffy".into()]),
        Annotation::new("window", BBox::from([100.5, 20.25, 300.0, 220.0])),
        Annotation::new("cat", BBox::from([60.0, 60.0, 70.0, 75.0])).with_description("kitten"),
    ];

    let scene = SceneMetadata {
        scene_description: "Two cats by a window".into(),
        frame_theme: "domestic".into(),
        background_theme: "interior".into(),
        is_match: false,
        style: "impressionism".into(),
        source: "museum scan".into(),
        artist: "unknown".into(),
    };

    (annotations, scene)
}

#[test]
fn test_roundtrip_preserves_annotations_and_scene() {
    let (annotations, scene) = create_full_state();
    let mut registry = CategoryRegistry::new();
    registry.merge(annotations.iter().map(|a| a.trimmed_label()));

    let image = ImageInfo::new("cats.jpg").with_dimensions(800, 600);
    let (doc, _) = export_document(
        &annotations,
        &scene,
        &registry,
        &image,
        &ExportOptions::default(),
    );

    let bytes = doc.to_json_vec().unwrap();
    let parsed = ExportDocument::from_json_slice(&bytes).unwrap();
    assert_eq!(parsed, doc);

    let imported = import_document(&parsed);
    assert_eq!(imported.annotations, annotations);
    assert_eq!(imported.scene, scene);
}

#[test]
fn test_roundtrip_trims_labels() {
    let annotations = vec![Annotation::new("  tree ", BBox::from([0.0, 0.0, 10.0, 10.0]))];
    let (doc, _) = export_document(
        &annotations,
        &SceneMetadata::default(),
        &CategoryRegistry::new(),
        &ImageInfo::new("a.png"),
        &ExportOptions::default(),
    );

    let imported = import_document(&doc);
    assert_eq!(imported.annotations[0].label, "tree");
    assert_eq!(imported.annotations[0].bbox, annotations[0].bbox);
}

#[test]
fn test_roundtrip_drops_empty_labels_only() {
    let (mut annotations, scene) = create_full_state();
    annotations.insert(1, Annotation::new("", BBox::from([1.0, 1.0, 2.0, 2.0])));

    let (doc, result) = export_document(
        &annotations,
        &scene,
        &CategoryRegistry::new(),
        &ImageInfo::new("cats.jpg"),
        &ExportOptions::default(),
    );
    assert_eq!(result.annotations_exported, 3);

    let imported = import_document(&doc);
    let (expected, _) = create_full_state();
    assert_eq!(imported.annotations, expected);
}
