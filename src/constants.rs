//! Global constants for the annotation session

/// Pointer travel (in image pixels) beyond which a press-release is a drag.
pub const DEFAULT_DRAG_THRESHOLD: f32 = 5.0;

/// Label given to a box right after it is drawn.
pub const DEFAULT_LABEL: &str = "new annotation";

/// Name of the shared label to category id map inside a save directory.
pub const CATEGORY_MAP_FILE: &str = "category_map.json";

/// Directory prefix written into `image_path` of export documents.
pub const DEFAULT_IMAGE_PATH_PREFIX: &str = "data/images";

/// Base URL of the object detection service.
pub const DEFAULT_DETECTOR_URL: &str = "http://127.0.0.1:8000";

/// Route of the detection endpoint on the detector service.
pub const DETECT_ROUTE: &str = "detect-objects";

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp", "gif"];
