//! Catalog of glTF models that can be placed on the globe.
//!
//! Each entry is a plain value record; placement interprets it in
//! [`crate::models`]. The built-in catalog places the sample models over
//! Eugene, Oregon. A catalog can also be read from a JSON array of entries.

use std::collections::HashSet;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::geodesy::{GeoPosition, HeadingPitchRoll};

/// Latitude shared by the built-in placements.
const SITE_LATITUDE: f64 = 44.050_370_6;
/// Longitude shared by the built-in placements.
const SITE_LONGITUDE: f64 = -123.074_461_9;
/// Heading shared by the built-in placements, in degrees.
const SITE_HEADING_DEG: f64 = 135.0;

/// Smallest on-screen size of a placed model, in pixels.
pub const DEFAULT_MINIMUM_PIXEL_SIZE: f32 = 128.0;
/// Largest scale factor applied to keep a model visible.
pub const DEFAULT_MAXIMUM_SCALE: f32 = 20_000.0;

/// Orientation of a placement in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Orientation {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Orientation {
    pub fn to_heading_pitch_roll(self) -> HeadingPitchRoll {
        HeadingPitchRoll::from_degrees(self.heading, self.pitch, self.roll)
    }
}

/// A model that can be placed on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPlacement {
    /// Display label, unique within a catalog.
    pub label: String,
    /// Where the model is placed.
    pub position: GeoPosition,
    /// Orientation relative to the local east-north-up frame.
    #[serde(default)]
    pub orientation: Orientation,
    /// Asset path of the glTF model.
    pub model: String,
    /// Smallest on-screen size in pixels.
    #[serde(default = "default_minimum_pixel_size")]
    pub minimum_pixel_size: f32,
    /// Upper bound on the scale used to honour `minimum_pixel_size`.
    #[serde(default = "default_maximum_scale")]
    pub maximum_scale: f32,
}

fn default_minimum_pixel_size() -> f32 {
    DEFAULT_MINIMUM_PIXEL_SIZE
}

fn default_maximum_scale() -> f32 {
    DEFAULT_MAXIMUM_SCALE
}

impl ModelPlacement {
    /// A placement at the built-in site, facing south-east.
    fn at_site(label: &str, model: &str, height: f64) -> Self {
        Self {
            label: label.to_string(),
            position: GeoPosition::new(SITE_LATITUDE, SITE_LONGITUDE, height),
            orientation: Orientation {
                heading: SITE_HEADING_DEG,
                pitch: 0.0,
                roll: 0.0,
            },
            model: model.to_string(),
            minimum_pixel_size: DEFAULT_MINIMUM_PIXEL_SIZE,
            maximum_scale: DEFAULT_MAXIMUM_SCALE,
        }
    }
}

/// The set of placeable models.
#[derive(Resource, Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelPlacement>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    /// The sample models shipped with the viewer.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                ModelPlacement::at_site("Aircraft", "models/CesiumAir/Cesium_Air.glb", 5000.0),
                ModelPlacement::at_site(
                    "Ground Vehicle",
                    "models/GroundVehicle/GroundVehicle.glb",
                    0.0,
                ),
                ModelPlacement::at_site(
                    "Hot Air Balloon",
                    "models/CesiumBalloon/CesiumBalloon.glb",
                    1000.0,
                ),
                ModelPlacement::at_site(
                    "Milk Truck",
                    "models/CesiumMilkTruck/CesiumMilkTruck-kmc.glb",
                    0.0,
                ),
                ModelPlacement::at_site(
                    "Skinned Character",
                    "models/CesiumMan/Cesium_Man.glb",
                    0.0,
                ),
                ModelPlacement::at_site(
                    "Draco Compressed Model",
                    "models/DracoCompressed/CesiumMilkTruck.gltf",
                    0.0,
                ),
            ],
        }
    }

    /// Build a catalog, rejecting empty or duplicate labels.
    pub fn from_entries(entries: Vec<ModelPlacement>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.label.trim().is_empty() {
                return Err(ViewerError::InvalidCatalog {
                    detail: format!("entry for '{}' has an empty label", entry.model),
                });
            }
            if !seen.insert(entry.label.as_str()) {
                return Err(ViewerError::InvalidCatalog {
                    detail: format!("duplicate label '{}'", entry.label),
                });
            }
            if entry.model.trim().is_empty() {
                return Err(ViewerError::InvalidCatalog {
                    detail: format!("entry '{}' has no model", entry.label),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Parse a catalog from JSON text. `path` is only used for error context.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let entries: Vec<ModelPlacement> =
            serde_json::from_str(text).map_err(|e| ViewerError::CatalogParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_entries(entries)
    }

    /// Read a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ViewerError::CatalogIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    pub fn get(&self, label: &str) -> Option<&ModelPlacement> {
        self.entries.iter().find(|entry| entry.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelPlacement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.len(), 6);

        let aircraft = catalog.get("Aircraft").unwrap();
        assert_eq!(aircraft.position.height, 5000.0);
        assert_eq!(aircraft.orientation.heading, 135.0);
        assert_eq!(aircraft.minimum_pixel_size, 128.0);
        assert_eq!(aircraft.maximum_scale, 20_000.0);

        let balloon = catalog.get("Hot Air Balloon").unwrap();
        assert_eq!(balloon.position.height, 1000.0);

        // All built-in placements share one site.
        assert!(catalog.iter().all(|entry| entry.position.latitude == SITE_LATITUDE
            && entry.position.longitude == SITE_LONGITUDE));

        // Built-in labels must pass validation.
        let entries: Vec<_> = catalog.iter().cloned().collect();
        assert!(ModelCatalog::from_entries(entries).is_ok());
    }

    #[test]
    fn test_parse_applies_defaults() {
        let text = r#"[
            {
                "label": "Tower",
                "position": { "latitude": 48.8584, "longitude": 2.2945 },
                "model": "models/Tower/tower.glb"
            }
        ]"#;
        let catalog = ModelCatalog::parse(Path::new("inline.json"), text).unwrap();
        let tower = catalog.get("Tower").unwrap();
        assert_eq!(tower.position.height, 0.0);
        assert_eq!(tower.orientation, Orientation::default());
        assert_eq!(tower.minimum_pixel_size, DEFAULT_MINIMUM_PIXEL_SIZE);
        assert_eq!(tower.maximum_scale, DEFAULT_MAXIMUM_SCALE);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let entry = ModelPlacement::at_site("Truck", "models/truck.glb", 0.0);
        let result = ModelCatalog::from_entries(vec![entry.clone(), entry]);
        assert!(matches!(result, Err(ViewerError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_empty_label_rejected() {
        let entry = ModelPlacement::at_site("  ", "models/truck.glb", 0.0);
        let result = ModelCatalog::from_entries(vec![entry]);
        assert!(matches!(result, Err(ViewerError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = ModelCatalog::parse(Path::new("broken.json"), "{ not json");
        assert!(matches!(result, Err(ViewerError::CatalogParse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ModelCatalog::load(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(ViewerError::CatalogIo { .. })));
    }
}
