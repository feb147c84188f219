//! `manifest.json` describing the layers and tiles of a model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TilerError, TilerResult};

/// File name of the manifest in the model's output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model: String,
    /// Largest extent of the model bounds.
    pub world_size: f64,
    pub bounds_min: [f64; 3],
    pub bounds_max: [f64; 3],
    pub layers: Vec<LayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub index: u32,
    /// Fraction of the geometry this layer is meant to keep.
    pub keep_fraction: f64,
    pub voxel_pitch: f64,
    pub tiles: Vec<TileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    pub file: String,
    pub cell: [i32; 3],
    pub center: [f64; 3],
}

impl Manifest {
    pub fn tile_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.tiles.len()).sum()
    }

    /// Write the manifest into `dir`.
    pub fn save(&self, dir: &Path) -> TilerResult<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| TilerError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| TilerError::io(&path, &e))
    }
}
