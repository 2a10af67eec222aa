//! HTTP client for the Florence-2 detection service.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::config::DetectorConfig;
use crate::constants::DETECT_ROUTE;
use crate::detect::{DetectError, DetectionResponse, Detector, parse_response};

/// Blocking client for `POST /detect-objects`.
///
/// Sends `{"image_b64": "<base64 image>"}` and expects
/// `{"objects": [{"label": "...", "box": [x1, y1, x2, y2]}], "caption": "..."}`.
pub struct FlorenceClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl FlorenceClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();
        Self {
            endpoint: detect_endpoint(base_url),
            agent,
        }
    }

    /// Create a client from the `detector` section of the config.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            &config.url,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.read_timeout_secs),
        )
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Detector for FlorenceClient {
    fn detect(&self, image: &[u8]) -> Result<DetectionResponse, DetectError> {
        log::info!(
            "Requesting detections for {} byte image from {}",
            image.len(),
            self.endpoint
        );

        let payload = json!({ "image_b64": STANDARD.encode(image) });
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_string(&payload.to_string());

        let body = match response {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| DetectError::Transport(format!("failed to read response: {e}")))?,
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(DetectError::Status { status, body });
            }
            Err(err) => return Err(DetectError::Transport(err.to_string())),
        };

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| DetectError::InvalidResponse(format!("not JSON: {e}")))?;
        let response = parse_response(&value)?;

        log::info!(
            "Detector returned {} objects ({} rejected)",
            response.detections.len(),
            response.rejected
        );
        Ok(response)
    }
}

fn detect_endpoint(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with(DETECT_ROUTE) {
        base.to_string()
    } else {
        format!("{base}/{DETECT_ROUTE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        assert_eq!(
            detect_endpoint("http://127.0.0.1:8000"),
            "http://127.0.0.1:8000/detect-objects"
        );
        assert_eq!(
            detect_endpoint("http://host:8000/"),
            "http://host:8000/detect-objects"
        );
        assert_eq!(
            detect_endpoint("http://host/api/detect-objects"),
            "http://host/api/detect-objects"
        );
    }

    #[test]
    fn test_unreachable_service_is_transport_error() {
        let client = FlorenceClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        assert!(matches!(
            client.detect(b"not really an image"),
            Err(DetectError::Transport(_))
        ));
    }
}
