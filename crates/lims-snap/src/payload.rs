//! Payload types handed to the polygon-snapping module
//!
//! Field names serialize exactly as the snapping module's input schema
//! expects them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AssemblyError, Result};
use crate::path::PolygonPath;

/// A labeled polygon boundary (layer acronym, "Pia" or "White Matter")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPath {
    /// Structure acronym or surface label
    pub name: String,
    /// Boundary vertices
    pub path: PolygonPath,
}

impl NamedPath {
    /// Create a named path
    pub fn new(name: impl Into<String>, path: PolygonPath) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Pixel dimensions of the series' Biocytin image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Image width
    pub width: f64,
    /// Image height
    pub height: f64,
}

impl ImageDimensions {
    /// Create dimensions, rejecting non-positive or non-finite values
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(AssemblyError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }
}

/// Source and destination of one raw image file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImagePathPair {
    /// Location of the jp2 in LIMS storage
    pub input_path: PathBuf,
    /// Where the downstream module writes its copy
    pub output_path: PathBuf,
}

/// Everything the snapping module needs for one imaging series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPayload {
    /// Cortical layer polygons
    pub layer_polygons: Vec<NamedPath>,
    /// Pia surface curve
    pub pia_surface: NamedPath,
    /// White matter surface curve
    pub wm_surface: NamedPath,
    /// Dimensions of the series image
    pub image_dimensions: ImageDimensions,
    /// Image copies; omitted entirely when no output root was configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImagePathPair>>,
}

impl InputPayload {
    /// Serialize to a JSON string
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(images: Option<Vec<ImagePathPair>>) -> InputPayload {
        InputPayload {
            layer_polygons: Vec::new(),
            pia_surface: NamedPath::new("Pia", PolygonPath::default()),
            wm_surface: NamedPath::new("White Matter", PolygonPath::default()),
            image_dimensions: ImageDimensions::new(10.0, 20.0).unwrap(),
            images,
        }
    }

    #[test]
    fn test_dimensions_must_be_positive() {
        assert!(ImageDimensions::new(1.0, 1.0).is_ok());
        assert!(ImageDimensions::new(0.0, 1.0).is_err());
        assert!(ImageDimensions::new(1.0, -5.0).is_err());
        assert!(ImageDimensions::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_images_key_omitted_when_none() {
        let json = serde_json::to_value(payload(None)).unwrap();
        assert!(json.get("images").is_none());
        assert!(json.get("layer_polygons").is_some());
    }

    #[test]
    fn test_images_key_present_when_empty() {
        let json = serde_json::to_value(payload(Some(Vec::new()))).unwrap();
        assert_eq!(json["images"], serde_json::json!([]));
    }

    #[test]
    fn test_round_trips_through_json() {
        let original = payload(Some(vec![ImagePathPair {
            input_path: "/d/a.jp2".into(),
            output_path: "/out/DAPI_a.jp2".into(),
        }]));
        let json = original.to_json(true).unwrap();
        let parsed: InputPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
