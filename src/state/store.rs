//! Annotation list of the currently open image.

use thiserror::Error;

use crate::constants::DEFAULT_LABEL;
use crate::detect::Detection;
use crate::model::geometry::hit_test;
use crate::model::{Annotation, BBox, Point, parse_attributes};

/// Store operations that cannot proceed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Update/delete needs a selected annotation.
    #[error("No annotation selected")]
    NoSelection,

    /// Zero-area boxes are never committed.
    #[error("Box has zero area")]
    DegenerateBox,
}

/// Ordered annotations plus the active selection.
///
/// The selection is an index into the list and is kept valid across every
/// operation: it is either `None` or `< len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    selected: Option<usize>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a box with the default label and select it.
    pub fn create(&mut self, bbox: BBox) -> Result<usize, StoreError> {
        self.create_labelled(bbox, DEFAULT_LABEL)
    }

    /// Append a box with the given label and select it.
    pub fn create_labelled(
        &mut self,
        bbox: BBox,
        label: impl Into<String>,
    ) -> Result<usize, StoreError> {
        if bbox.is_degenerate() {
            return Err(StoreError::DegenerateBox);
        }
        self.annotations.push(Annotation::new(label, bbox));
        let index = self.annotations.len() - 1;
        self.selected = Some(index);
        Ok(index)
    }

    /// Select an annotation, or clear the selection.
    ///
    /// An out-of-range index clears the selection and returns false.
    pub fn select(&mut self, index: Option<usize>) -> bool {
        match index {
            Some(i) if i >= self.annotations.len() => {
                self.selected = None;
                false
            }
            _ => {
                self.selected = index;
                true
            }
        }
    }

    /// Get the selected annotation index.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Get the selected annotation.
    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|i| self.annotations.get(i))
    }

    /// Apply the edit fields to the selected annotation.
    ///
    /// Label and description are trimmed; attributes are split on commas.
    pub fn update_selected(
        &mut self,
        label: &str,
        description: &str,
        attributes_text: &str,
    ) -> Result<(), StoreError> {
        let ann = self
            .selected
            .and_then(|i| self.annotations.get_mut(i))
            .ok_or(StoreError::NoSelection)?;
        ann.label = label.trim().to_string();
        ann.description = description.trim().to_string();
        ann.attributes = parse_attributes(attributes_text);
        Ok(())
    }

    /// Remove the selected annotation and clear the selection.
    ///
    /// Later annotations shift down by one.
    pub fn delete_selected(&mut self) -> Result<Annotation, StoreError> {
        let index = self
            .selected
            .filter(|i| *i < self.annotations.len())
            .ok_or(StoreError::NoSelection)?;
        self.selected = None;
        Ok(self.annotations.remove(index))
    }

    /// Replace the whole list, keeping `selected` only if it fits the new list.
    ///
    /// Returns false if a stale selection had to be dropped.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>, selected: Option<usize>) -> bool {
        self.annotations = annotations;
        self.select(selected)
    }

    /// Append detections as fresh annotations without selecting them.
    pub fn ingest_detections<I>(&mut self, detections: I) -> usize
    where
        I: IntoIterator<Item = Detection>,
    {
        let before = self.annotations.len();
        self.annotations.extend(
            detections
                .into_iter()
                .map(|detection| Annotation::new(detection.label, detection.bbox)),
        );
        self.annotations.len() - before
    }

    /// Index of the smallest annotation containing `point`.
    pub fn hit_test(&self, point: &Point) -> Option<usize> {
        hit_test(point, self.annotations.iter().map(|a| &a.bbox))
    }

    pub fn get(&self, index: usize) -> Option<&Annotation> {
        self.annotations.get(index)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Get all annotations.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// Trimmed non-empty labels in list order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.annotations
            .iter()
            .map(Annotation::trimmed_label)
            .filter(|label| !label.is_empty())
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Remove every annotation and the selection.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BBox {
        BBox::from([x1, y1, x2, y2])
    }

    fn store_with(labels: &[&str]) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for (i, label) in labels.iter().enumerate() {
            let offset = i as f32 * 10.0;
            store
                .create_labelled(bbox(offset, offset, offset + 5.0, offset + 5.0), *label)
                .unwrap();
        }
        store.select(None);
        store
    }

    #[test]
    fn test_create_selects_new_annotation() {
        let mut store = AnnotationStore::new();
        let index = store.create(bbox(50.0, 40.0, 10.0, 10.0)).unwrap();

        assert_eq!(index, 0);
        assert_eq!(store.selected(), Some(0));
        let ann = store.selected_annotation().unwrap();
        assert_eq!(ann.label, DEFAULT_LABEL);
        assert_eq!(ann.bbox.corners(), [10.0, 10.0, 50.0, 40.0]);
    }

    #[test]
    fn test_create_rejects_zero_area() {
        let mut store = AnnotationStore::new();
        assert_eq!(
            store.create(bbox(10.0, 10.0, 10.0, 40.0)),
            Err(StoreError::DegenerateBox)
        );
        assert!(store.is_empty());
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_update_selected_trims_and_splits() {
        let mut store = store_with(&["a"]);
        store.select(Some(0));
        store
            .update_selected("  cat ", " sleeping  ", "orange, , fluffy ,")
            .unwrap();

        let ann = store.get(0).unwrap();
        assert_eq!(ann.label, "cat");
        assert_eq!(ann.description, "sleeping");
        assert_eq!(ann.attributes, vec!["orange", "fluffy"]);
    }

    #[test]
    fn test_update_without_selection() {
        let mut store = store_with(&["a"]);
        let before = store.clone();
        assert_eq!(
            store.update_selected("x", "y", "z"),
            Err(StoreError::NoSelection)
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_delete_shifts_and_clears_selection() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.select(Some(1));

        let removed = store.delete_selected().unwrap();
        assert_eq!(removed.label, "b");
        assert_eq!(store.selected(), None);
        let labels: Vec<_> = store.labels().collect();
        assert_eq!(labels, vec!["a", "c", "d"]);

        assert_eq!(store.delete_selected(), Err(StoreError::NoSelection));
    }

    #[test]
    fn test_replace_all_validates_selection() {
        let mut store = store_with(&["a", "b", "c"]);
        store.select(Some(2));

        let single = vec![Annotation::new("x", bbox(0.0, 0.0, 1.0, 1.0))];
        assert!(!store.replace_all(single, Some(2)));
        assert_eq!(store.selected(), None);
        assert_eq!(store.len(), 1);

        let pair = store_with(&["p", "q"]).annotations().to_vec();
        assert!(store.replace_all(pair, Some(1)));
        assert_eq!(store.selected(), Some(1));
    }

    #[test]
    fn test_ingest_detections_is_additive() {
        let mut store = store_with(&["cat"]);
        let added = store.ingest_detections([
            Detection::new("cat", bbox(0.0, 0.0, 5.0, 5.0)),
            Detection::new("dog", bbox(1.0, 1.0, 9.0, 9.0)),
        ]);

        assert_eq!(added, 2);
        assert_eq!(store.len(), 3);
        assert_eq!(store.selected(), None);
        assert!(store.get(2).unwrap().description.is_empty());
        assert!(store.get(2).unwrap().attributes.is_empty());
    }

    #[test]
    fn test_hit_test_selects_nested_box() {
        let mut store = AnnotationStore::new();
        store.create(bbox(0.0, 0.0, 100.0, 100.0)).unwrap();
        store.create(bbox(40.0, 40.0, 60.0, 60.0)).unwrap();

        assert_eq!(store.hit_test(&Point::new(50.0, 50.0)), Some(1));
        assert_eq!(store.hit_test(&Point::new(5.0, 5.0)), Some(0));
        assert_eq!(store.hit_test(&Point::new(500.0, 5.0)), None);
    }

    #[test]
    fn test_labels_skip_blank() {
        let store = store_with(&["cat", "  ", " dog "]);
        assert_eq!(store.labels().collect::<Vec<_>>(), vec!["cat", "dog"]);
    }
}
