//! Object detection collaborator.
//!
//! Detection itself is delegated to an external service. This module defines
//! what the session consumes from it ("given image bytes, return labelled
//! boxes") and validates the service reply at the boundary: every entry of
//! `objects` is checked on its own, so one malformed entry does not cost the
//! rest of the batch.

mod florence;

use serde_json::Value;
use thiserror::Error;

use crate::model::BBox;
use crate::model::geometry::normalize_box;

pub use florence::FlorenceClient;

/// One labelled box returned by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            bbox,
        }
    }
}

/// Validated detector reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResponse {
    /// Valid detections in reply order.
    pub detections: Vec<Detection>,
    /// Whole-image caption, if the service produced one.
    pub caption: Option<String>,
    /// Number of `objects` entries dropped as malformed.
    pub rejected: usize,
}

/// Errors from talking to the detector.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Request never produced an HTTP response.
    #[error("Detector unreachable: {0}")]
    Transport(String),

    /// Service answered with a non-success status.
    #[error("Detector returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for the user-facing message
        body: String,
    },

    /// Reply body is not the expected JSON shape.
    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),
}

/// Anything that can turn image bytes into labelled boxes.
pub trait Detector {
    /// Run detection on the encoded image.
    fn detect(&self, image: &[u8]) -> Result<DetectionResponse, DetectError>;
}

/// Validate a detector reply of the form `{"objects": [...], "caption": "..."}`.
///
/// The top level must be an object with an `objects` array; inside it each
/// entry needs a string `label` and a `box` of exactly four finite numbers
/// spanning a non-zero area.
pub fn parse_response(value: &Value) -> Result<DetectionResponse, DetectError> {
    let objects = value
        .get("objects")
        .and_then(Value::as_array)
        .ok_or_else(|| DetectError::InvalidResponse("missing 'objects' array".to_string()))?;

    let mut response = DetectionResponse {
        caption: value
            .get("caption")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
        ..DetectionResponse::default()
    };

    for (index, entry) in objects.iter().enumerate() {
        match parse_detection(entry) {
            Some(detection) => response.detections.push(detection),
            None => {
                log::warn!("Dropping malformed detection #{}: {}", index, entry);
                response.rejected += 1;
            }
        }
    }

    Ok(response)
}

fn parse_detection(entry: &Value) -> Option<Detection> {
    let label = entry.get("label")?.as_str()?;
    let coords = entry.get("box")?.as_array()?;
    if coords.len() != 4 {
        return None;
    }

    let mut corners = [0.0f32; 4];
    for (slot, coord) in corners.iter_mut().zip(coords) {
        let value = coord.as_f64()? as f32;
        if !value.is_finite() {
            return None;
        }
        *slot = value;
    }

    let bbox = normalize_box(corners);
    if bbox.is_degenerate() {
        return None;
    }
    Some(Detection::new(label, bbox))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let reply = json!({
            "objects": [
                { "label": "cat", "box": [50.0, 40.0, 10.0, 10.0] },
                { "label": "dog", "box": [1, 2, 3, 4] }
            ],
            "caption": "  A cat and a dog. "
        });

        let response = parse_response(&reply).unwrap();
        assert_eq!(response.detections.len(), 2);
        assert_eq!(
            response.detections[0],
            Detection::new("cat", BBox::from([10.0, 10.0, 50.0, 40.0]))
        );
        assert_eq!(response.caption.as_deref(), Some("A cat and a dog."));
        assert_eq!(response.rejected, 0);
    }

    #[test]
    fn test_malformed_entries_rejected_individually() {
        let reply = json!({
            "objects": [
                { "label": "cat", "box": [0, 0, 10, 10] },
                { "label": 7, "box": [0, 0, 10, 10] },
                { "label": "short", "box": [0, 0, 10] },
                { "label": "text", "box": [0, "a", 10, 10] },
                { "box": [0, 0, 10, 10] },
                "not an object"
            ]
        });

        let response = parse_response(&reply).unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].label, "cat");
        assert_eq!(response.rejected, 5);
        assert_eq!(response.caption, None);
    }

    #[test]
    fn test_zero_area_boxes_rejected() {
        let reply = json!({
            "objects": [
                { "label": "line", "box": [5, 5, 5, 20] },
                { "label": "dot", "box": [3, 3, 3, 3] },
                { "label": "cup", "box": [5, 5, 6, 20] }
            ]
        });

        let response = parse_response(&reply).unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].label, "cup");
        assert_eq!(response.rejected, 2);
    }

    #[test]
    fn test_missing_objects_is_an_error() {
        assert!(parse_response(&json!({ "caption": "x" })).is_err());
        assert!(parse_response(&json!([1, 2])).is_err());
    }
}
