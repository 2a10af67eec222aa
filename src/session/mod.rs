//! The annotation session.
//!
//! [`Session`] owns everything that belongs to the open image (annotation
//! list, scene metadata, pointer gesture) together with the state shared by
//! all images (category registry, recovery cache, save directory, image
//! folder and navigation).
//!
//! Every mutating call follows the same rules:
//! - it is rejected with [`SessionError::OperationInProgress`] while a
//!   detection request is pending;
//! - it is all-or-nothing: new state is built on temporaries and committed
//!   only once nothing can fail anymore;
//! - once committed, the recovery snapshot of the open image is rewritten.
//!
//! Switching images always flushes the old image's snapshot before resetting
//! and then restores the new image from the recovery cache, falling back to
//! the export document in the save directory, falling back to defaults.

mod error;


use std::io::Cursor;
use std::path::Path;

use crate::config::AppConfig;
use crate::constants::CATEGORY_MAP_FILE;
use crate::detect::{DetectError, DetectionResponse, Detector};
use crate::format::{
    ExportDocument, ExportOptions, ExportResult, FormatWarning, ImageInfo, ImportOptions,
    document_name, export_document, import_document,
};
use crate::model::{
    Annotation, BBox, CategoryRegistry, DrawingState, GestureOutcome, Point, SceneMetadata,
};
use crate::state::{
    AnnotationStore, NavState, Navigator, SessionCache, SessionSnapshot, is_image_filename,
};
use crate::storage::BlobStore;

pub use error::SessionError;

/// Where the state of a newly opened image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOrigin {
    /// Unsaved work from the recovery cache.
    Cache,
    /// Export document in the save directory.
    Durable,
    /// Nothing stored; empty defaults.
    Fresh,
}

/// Outcome of switching to another image.
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub image: String,
    pub origin: RestoreOrigin,
    pub warnings: Vec<FormatWarning>,
}

/// What a finished pointer gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Drag: a new annotation at this index, now selected.
    Created(usize),
    /// Click: selection is now this index (none if nothing was hit).
    Selected(Option<usize>),
    /// Release without a preceding press.
    Ignored,
}

/// Values shown in the edit fields for the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditFields {
    pub label: String,
    pub description: String,
    /// Attributes joined with `", "`.
    pub attributes: String,
}

/// Options for saving the open image.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Also write the image bytes under the image's name.
    pub copy_image: bool,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the image itself is written next to its document.
    pub fn copy_image(mut self, copy: bool) -> Self {
        self.copy_image = copy;
        self
    }
}

/// Outcome of importing a document onto the open image.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub annotations_imported: usize,
    /// Labels that received a new category id.
    pub new_categories: usize,
    pub warnings: Vec<FormatWarning>,
}

/// Image bytes handed to the detector between begin and complete.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a completed detection.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub added: usize,
    /// Malformed entries dropped from the reply.
    pub rejected: usize,
    /// Whether the caption became the scene description.
    pub caption_applied: bool,
}

#[derive(Debug)]
enum Pending {
    Detection { image: String },
}

#[derive(Debug)]
struct OpenImage {
    info: ImageInfo,
    bytes: Vec<u8>,
}

/// Annotation session over one image at a time.
pub struct Session {
    config: AppConfig,
    navigator: Navigator,
    store: AnnotationStore,
    scene: SceneMetadata,
    registry: CategoryRegistry,
    cache: SessionCache,
    save_dir: Option<Box<dyn BlobStore>>,
    source: Option<Box<dyn BlobStore>>,
    image: Option<OpenImage>,
    drawing: DrawingState,
    pending: Option<Pending>,
    /// Open image changed since it was restored or saved.
    dirty: bool,
}

impl Session {
    /// Create an empty session keeping recovery snapshots in `recovery`.
    pub fn new(config: AppConfig, recovery: Box<dyn BlobStore>) -> Self {
        log::debug!("Recovery cache at {}", recovery.describe());
        Self {
            config,
            navigator: Navigator::new(),
            store: AnnotationStore::new(),
            scene: SceneMetadata::default(),
            registry: CategoryRegistry::new(),
            cache: SessionCache::new(recovery),
            save_dir: None,
            source: None,
            image: None,
            drawing: DrawingState::default(),
            pending: None,
            dirty: false,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    pub fn selected(&self) -> Option<usize> {
        self.store.selected()
    }

    pub fn scene(&self) -> &SceneMetadata {
        &self.scene
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn nav_state(&self) -> NavState {
        self.navigator.state()
    }

    /// Progress string like "3/15".
    pub fn progress(&self) -> String {
        self.navigator.progress()
    }

    /// Name of the open image.
    pub fn current_image(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.info.name.as_str())
    }

    pub fn image_info(&self) -> Option<&ImageInfo> {
        self.image.as_ref().map(|image| &image.info)
    }

    pub fn has_save_directory(&self) -> bool {
        self.save_dir.is_some()
    }

    /// Whether a detection request is pending.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Box being dragged, for rendering. May be degenerate.
    pub fn drawing_preview(&self) -> Option<BBox> {
        self.drawing.preview()
    }

    /// Edit field contents for the selection; empty when nothing is selected.
    pub fn edit_fields(&self) -> EditFields {
        self.store
            .selected_annotation()
            .map(|ann| EditFields {
                label: ann.label.clone(),
                description: ann.description.clone(),
                attributes: ann.attributes_text(),
            })
            .unwrap_or_default()
    }

    /// Current state as a recovery snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            annotations: self.store.annotations().to_vec(),
            scene: self.scene.clone(),
            selected: self.store.selected(),
        }
    }

    // ------------------------------------------------------------------
    // Opening and navigation
    // ------------------------------------------------------------------

    /// Open one ad-hoc image outside any folder.
    pub fn open_single(&mut self, name: &str, bytes: Vec<u8>) -> Result<SwitchReport, SessionError> {
        self.ensure_idle()?;
        let name = file_name(name);
        let report = self.switch_to(&name, bytes);
        self.navigator.open_single(name);
        self.source = None;
        Ok(report)
    }

    /// Open every image in `source`, sorted by name, starting at the first.
    ///
    /// A folder without images closes the open image and returns `None`.
    pub fn open_folder(
        &mut self,
        source: Box<dyn BlobStore>,
    ) -> Result<Option<SwitchReport>, SessionError> {
        self.ensure_idle()?;
        let images: Vec<String> = source
            .list()?
            .into_iter()
            .filter(|name| is_image_filename(name))
            .collect();

        let Some(first) = images.first() else {
            log::info!("No images in {}", source.describe());
            self.flush_snapshot();
            self.reset_image_state();
            self.image = None;
            self.navigator.close();
            self.source = Some(source);
            return Ok(None);
        };

        let bytes = source.read(first)?;
        let report = self.switch_to(first, bytes);
        log::info!("Opened {} images from {}", images.len(), source.describe());
        self.navigator.open_folder(images);
        self.source = Some(source);
        Ok(Some(report))
    }

    /// Move `delta` images through the open folder.
    ///
    /// Past either end this is a no-op returning `None`.
    pub fn step(&mut self, delta: isize) -> Result<Option<SwitchReport>, SessionError> {
        self.ensure_idle()?;
        if !matches!(self.navigator.state(), NavState::Sequence { .. }) {
            return Err(SessionError::NotInSequence);
        }
        let Some(index) = self.navigator.target(delta) else {
            log::debug!("Step {} out of range at {}", delta, self.navigator.progress());
            return Ok(None);
        };
        let name = self
            .navigator
            .name_at(index)
            .map(String::from)
            .ok_or(SessionError::NotInSequence)?;
        let source = self.source.as_ref().ok_or(SessionError::NotInSequence)?;
        let bytes = source.read(&name)?;

        let report = self.switch_to(&name, bytes);
        self.navigator.go_to(index);
        Ok(Some(report))
    }

    pub fn next_image(&mut self) -> Result<Option<SwitchReport>, SessionError> {
        self.step(1)
    }

    pub fn prev_image(&mut self) -> Result<Option<SwitchReport>, SessionError> {
        self.step(-1)
    }

    /// Flush, reset, then restore from cache, durable storage or defaults.
    fn switch_to(&mut self, name: &str, bytes: Vec<u8>) -> SwitchReport {
        self.flush_snapshot();
        self.reset_image_state();

        let mut warnings = Vec::new();
        let info = image_info(name, &bytes, &mut warnings);
        self.image = Some(OpenImage { info, bytes });

        let origin = if self.restore_from_cache(name, &mut warnings) {
            RestoreOrigin::Cache
        } else if self.restore_from_save_dir(name, &mut warnings) {
            RestoreOrigin::Durable
        } else {
            RestoreOrigin::Fresh
        };

        log::info!(
            "Switched to '{}' ({:?}, {} annotations)",
            name,
            origin,
            self.store.len()
        );
        SwitchReport {
            image: name.to_string(),
            origin,
            warnings,
        }
    }

    fn restore_from_cache(&mut self, name: &str, warnings: &mut Vec<FormatWarning>) -> bool {
        match self.cache.load(name) {
            Ok(Some(snapshot)) => {
                if !self.store.replace_all(snapshot.annotations, snapshot.selected) {
                    warnings.push(
                        FormatWarning::info("Recovered selection was out of range and was cleared")
                            .with_image(name),
                    );
                }
                self.scene = snapshot.scene;
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("Ignoring recovery entry for '{}': {}", name, e);
                warnings.push(FormatWarning::warning(e.to_string()).with_image(name));
                false
            }
        }
    }

    fn restore_from_save_dir(&mut self, name: &str, warnings: &mut Vec<FormatWarning>) -> bool {
        let Some(save_dir) = self.save_dir.as_ref() else {
            return false;
        };
        let bytes = match save_dir.read_optional(&document_name(name)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Could not read saved annotations for '{}': {}", name, e);
                warnings.push(FormatWarning::warning(e.to_string()).with_image(name));
                return false;
            }
        };
        let doc = match ExportDocument::from_json_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Ignoring malformed document for '{}': {}", name, e);
                warnings.push(FormatWarning::warning(e.to_string()).with_image(name));
                return false;
            }
        };

        let imported = import_document(&doc);
        self.registry.merge(imported.labels());
        self.store.replace_all(imported.annotations, None);
        self.scene = imported.scene;
        true
    }

    /// Write the recovery snapshot of the open image before leaving it.
    fn flush_snapshot(&mut self) {
        self.drawing.cancel();
        if self.dirty {
            self.persist_snapshot();
        }
    }

    fn reset_image_state(&mut self) {
        self.store.clear();
        self.scene = SceneMetadata::default();
        self.drawing.cancel();
        self.dirty = false;
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Start a pointer gesture.
    pub fn pointer_down(&mut self, point: Point) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;
        self.drawing.press(point);
        Ok(())
    }

    /// Track the pointer while pressed.
    pub fn pointer_move(&mut self, point: Point) {
        self.drawing.drag_to(point);
    }

    /// Finish a pointer gesture: a drag draws a box, a click selects.
    pub fn pointer_up(&mut self, point: Point) -> Result<PointerOutcome, SessionError> {
        if self.pending.is_some() {
            self.drawing.cancel();
            return Err(SessionError::OperationInProgress);
        }
        self.ensure_image()?;

        match self.drawing.release(point, self.config.drag_threshold) {
            None => Ok(PointerOutcome::Ignored),
            Some(GestureOutcome::Draw(bbox)) => {
                let index = self.store.create(bbox)?;
                log::debug!("Drew box {:?} as annotation {}", bbox.corners(), index);
                self.persist_snapshot();
                Ok(PointerOutcome::Created(index))
            }
            Some(GestureOutcome::Click(point)) => {
                let hit = self.store.hit_test(&point);
                self.store.select(hit);
                log::debug!("Click at ({}, {}) selected {:?}", point.x, point.y, hit);
                self.persist_snapshot();
                Ok(PointerOutcome::Selected(hit))
            }
        }
    }

    /// Select an annotation or clear the selection.
    ///
    /// Out-of-range indices clear the selection.
    pub fn select(&mut self, index: Option<usize>) -> Result<Option<usize>, SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;
        self.store.select(index);
        self.persist_snapshot();
        Ok(self.store.selected())
    }

    /// Apply the edit fields to the selected annotation.
    pub fn update_selected(
        &mut self,
        label: &str,
        description: &str,
        attributes_text: &str,
    ) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;
        self.store.update_selected(label, description, attributes_text)?;
        self.persist_snapshot();
        Ok(())
    }

    /// Remove the selected annotation.
    pub fn delete_selected(&mut self) -> Result<Annotation, SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;
        let removed = self.store.delete_selected()?;
        log::debug!("Deleted annotation '{}'", removed.label);
        self.persist_snapshot();
        Ok(removed)
    }

    /// Replace the scene metadata of the open image.
    pub fn update_scene(&mut self, scene: SceneMetadata) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;
        self.scene = scene;
        self.persist_snapshot();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Durable storage
    // ------------------------------------------------------------------

    /// Use `store` as the save directory and load its category map.
    ///
    /// A missing map starts an empty registry. A map that is not a JSON
    /// object aborts the switch; bad entries inside it are dropped and
    /// reported.
    pub fn set_save_directory(
        &mut self,
        store: Box<dyn BlobStore>,
    ) -> Result<Vec<FormatWarning>, SessionError> {
        self.ensure_idle()?;
        let (registry, warnings) = match store.read_optional(CATEGORY_MAP_FILE)? {
            Some(bytes) => CategoryRegistry::from_json_slice(&bytes)?,
            None => (CategoryRegistry::new(), Vec::new()),
        };

        log::info!(
            "Save directory set to {} ({} categories)",
            store.describe(),
            registry.len()
        );
        self.registry = registry;
        self.save_dir = Some(store);
        Ok(warnings)
    }

    /// Export the open image and the category map to the save directory.
    ///
    /// On success the image's recovery snapshot is dropped.
    pub fn save(&mut self, options: &SaveOptions) -> Result<ExportResult, SessionError> {
        self.ensure_idle()?;
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;
        let save_dir = self.save_dir.as_mut().ok_or(SessionError::NoSaveDirectory)?;

        let mut registry = self.registry.clone();
        registry.merge(self.store.labels());

        let export_options =
            ExportOptions::new().image_path_prefix(self.config.image_path_prefix.clone());
        let (doc, mut result) = export_document(
            self.store.annotations(),
            &self.scene,
            &registry,
            &image.info,
            &export_options,
        );
        let doc_bytes = doc.to_json_vec()?;
        let map_bytes = registry.to_json_vec()?;

        let doc_name = document_name(&image.info.name);
        save_dir.write(&doc_name, &doc_bytes)?;
        result.files_created.push(doc_name);
        save_dir.write(CATEGORY_MAP_FILE, &map_bytes)?;
        result.files_created.push(CATEGORY_MAP_FILE.to_string());
        if options.copy_image {
            save_dir.write(&image.info.name, &image.bytes)?;
            result.files_created.push(image.info.name.clone());
        }

        for warning in &result.warnings {
            log::warn!("{}", warning);
        }
        log::info!(
            "Saved {} annotations for '{}' to {}",
            result.annotations_exported,
            image.info.name,
            save_dir.describe()
        );

        let name = image.info.name.clone();
        self.registry = registry;
        self.dirty = false;
        if let Err(e) = self.cache.clear(&name) {
            log::warn!("Failed to clear recovery entry for '{}': {}", name, e);
        }
        Ok(result)
    }

    /// Replace the open image's annotations and scene with a document.
    ///
    /// A malformed document is rejected whole. In merge mode the existing
    /// registry always wins and new labels take fresh ids; otherwise the
    /// registry is rebuilt from the document.
    pub fn import_document(
        &mut self,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> Result<ImportReport, SessionError> {
        self.ensure_idle()?;
        self.ensure_image()?;

        let doc = ExportDocument::from_json_slice(bytes)?;
        let imported = import_document(&doc);

        let mut warnings = Vec::new();
        let (registry, new_categories) = if options.merge {
            let mut registry = self.registry.clone();
            let added = registry.merge(imported.labels());
            (registry, added)
        } else {
            let mut registry = CategoryRegistry::new();
            warnings.extend(
                registry.load(
                    imported
                        .category_hints
                        .iter()
                        .filter(|(_, id)| id.is_some())
                        .cloned(),
                ),
            );
            let loaded = registry.len();
            let added = registry.merge(imported.labels());
            (registry, loaded + added)
        };

        let report = ImportReport {
            annotations_imported: imported.annotations.len(),
            new_categories,
            warnings,
        };
        self.store.replace_all(imported.annotations, None);
        self.scene = imported.scene;
        self.registry = registry;
        log::info!(
            "Imported {} annotations ({} new categories)",
            report.annotations_imported,
            report.new_categories
        );
        self.persist_snapshot();
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Detection
    // ------------------------------------------------------------------

    /// Mark the session busy and hand out the image to detect on.
    pub fn begin_detection(&mut self) -> Result<DetectionRequest, SessionError> {
        self.ensure_idle()?;
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;
        let request = DetectionRequest {
            image: image.info.name.clone(),
            bytes: image.bytes.clone(),
        };
        self.pending = Some(Pending::Detection {
            image: request.image.clone(),
        });
        log::debug!("Detection started for '{}'", request.image);
        Ok(request)
    }

    /// Finish the pending detection with the detector's reply.
    ///
    /// Detections are appended only on success; on failure nothing changes.
    pub fn complete_detection(
        &mut self,
        reply: Result<DetectionResponse, DetectError>,
    ) -> Result<DetectionReport, SessionError> {
        let Some(Pending::Detection { image }) = self.pending.take() else {
            return Err(SessionError::NothingPending);
        };
        let response = reply?;

        if self.current_image() != Some(image.as_str()) {
            log::warn!("Discarding detections for '{}': image no longer open", image);
            return Err(SessionError::NoImage);
        }

        let caption_applied = match response.caption {
            Some(caption) if self.scene.scene_description.trim().is_empty() => {
                self.scene.scene_description = caption;
                true
            }
            _ => false,
        };
        let added = self.store.ingest_detections(response.detections);
        log::info!(
            "Added {} detections to '{}' ({} rejected)",
            added,
            image,
            response.rejected
        );
        self.persist_snapshot();

        Ok(DetectionReport {
            added,
            rejected: response.rejected,
            caption_applied,
        })
    }

    /// Abort the pending detection. Returns false if none was pending.
    pub fn cancel_detection(&mut self) -> bool {
        let cancelled = self.pending.take().is_some();
        if cancelled {
            log::info!("Detection cancelled");
        }
        cancelled
    }

    /// Run detection synchronously with `detector`.
    pub fn run_detection(
        &mut self,
        detector: &dyn Detector,
    ) -> Result<DetectionReport, SessionError> {
        let request = self.begin_detection()?;
        let reply = detector.detect(&request.bytes);
        self.complete_detection(reply)
    }

    // ------------------------------------------------------------------
    // Recovery cache
    // ------------------------------------------------------------------

    /// Whether unsaved work for `image` is in the recovery cache.
    pub fn has_recovery(&self, image: &str) -> Result<bool, SessionError> {
        Ok(self.cache.contains(image)?)
    }

    /// Drop the recovery snapshot of the open image.
    pub fn clear_recovery(&mut self) -> Result<bool, SessionError> {
        self.ensure_idle()?;
        let name = self.current_image().ok_or(SessionError::NoImage)?.to_string();
        let removed = self.cache.clear(&name)?;
        self.dirty = false;
        Ok(removed)
    }

    /// Drop every recovery snapshot.
    pub fn clear_all_recovery(&mut self) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        let removed = self.cache.clear_all()?;
        self.dirty = false;
        Ok(removed)
    }

    /// Rewrite the open image's recovery snapshot. Failures are logged; the
    /// mutation that triggered the write stands.
    fn persist_snapshot(&mut self) {
        let Some(image) = self.image.as_ref() else {
            return;
        };
        self.dirty = true;
        let snapshot = self.snapshot();
        if let Err(e) = self.cache.save(&image.info.name, &snapshot) {
            log::warn!(
                "Failed to write recovery entry for '{}': {}",
                image.info.name,
                e
            );
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::OperationInProgress);
        }
        Ok(())
    }

    fn ensure_image(&self) -> Result<(), SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        Ok(())
    }
}

/// File name part of a path-like image name.
fn file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Describe an image, decoding its dimensions from the header.
fn image_info(name: &str, bytes: &[u8], warnings: &mut Vec<FormatWarning>) -> ImageInfo {
    let info = ImageInfo::new(name);
    let dimensions = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.into_dimensions());
    match dimensions {
        Ok((width, height)) => info.with_dimensions(width, height),
        Err(e) => {
            log::warn!("Could not read dimensions of '{}': {}", name, e);
            warnings.push(
                FormatWarning::warning(format!("Could not read image dimensions: {e}"))
                    .with_image(name),
            );
            info
        }
    }
}
