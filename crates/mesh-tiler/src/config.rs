//! Tiler configuration and per-layer parameters.

use std::path::PathBuf;

use crate::error::{TilerError, TilerResult};

/// Number of LOD layers.
pub const DEFAULT_NUM_LAYERS: u32 = 5;
/// Number of worker threads.
pub const DEFAULT_NUM_THREADS: usize = 6;
/// Fraction of geometry kept on the coarsest layer.
pub const DEFAULT_SIMPLIFICATION_MIN: f64 = 0.1;
/// Fraction of geometry kept on the finest layer.
pub const DEFAULT_SIMPLIFICATION_MAX: f64 = 0.8;
/// Faces below this shape quality (0..1) are penalized by simplification.
pub const DEFAULT_MESH_QUALITY: f64 = 0.07;
/// Weight for preserving boundary edges during simplification.
pub const DEFAULT_EDGE_WEIGHT: f64 = 100.0;
/// Weight for preserving texture coordinates during simplification.
pub const DEFAULT_TEXTURE_WEIGHT: f64 = 100.0;

/// Settings for one tiling run.
#[derive(Debug, Clone, PartialEq)]
pub struct TilerConfig {
    /// Input OBJ model.
    pub input: PathBuf,
    /// Directory receiving `<model_name>/`.
    pub output_root: PathBuf,
    pub num_layers: u32,
    pub num_threads: usize,
    pub simplification_min: f64,
    pub simplification_max: f64,
    pub mesh_quality: f64,
    pub edge_weight: f64,
    pub texture_weight: f64,
}

impl TilerConfig {
    /// A configuration with default tuning for `input`, writing under `output_root`.
    pub fn new(input: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_root: output_root.into(),
            num_layers: DEFAULT_NUM_LAYERS,
            num_threads: DEFAULT_NUM_THREADS,
            simplification_min: DEFAULT_SIMPLIFICATION_MIN,
            simplification_max: DEFAULT_SIMPLIFICATION_MAX,
            mesh_quality: DEFAULT_MESH_QUALITY,
            edge_weight: DEFAULT_EDGE_WEIGHT,
            texture_weight: DEFAULT_TEXTURE_WEIGHT,
        }
    }

    pub fn validate(&self) -> TilerResult<()> {
        let invalid = |detail: String| Err(TilerError::InvalidConfig { detail });

        if self.num_layers == 0 {
            return invalid("at least one layer is required".to_string());
        }
        if self.num_threads == 0 {
            return invalid("at least one worker thread is required".to_string());
        }
        if !(self.simplification_min > 0.0
            && self.simplification_min <= self.simplification_max
            && self.simplification_max <= 1.0)
        {
            return invalid(format!(
                "simplification bounds must satisfy 0 < min <= max <= 1, got {}..{}",
                self.simplification_min, self.simplification_max
            ));
        }
        if !(0.0..=1.0).contains(&self.mesh_quality) {
            return invalid(format!(
                "mesh quality must be in 0..=1, got {}",
                self.mesh_quality
            ));
        }
        Ok(())
    }

    /// Fraction of the geometry layer `layer` keeps.
    ///
    /// Grows exponentially from just above `simplification_min` to exactly
    /// `simplification_max` on the last layer.
    pub fn keep_fraction(&self, layer: u32) -> f64 {
        let k = (self.simplification_max / self.simplification_min).ln()
            / f64::from(self.num_layers);
        self.simplification_min * (k * f64::from(layer + 1)).exp()
    }
}

/// Edge length of the voxels that cut layer `layer` into tiles.
///
/// Layer 0 splits the model's largest extent in two; each further layer
/// halves the pitch.
pub fn voxel_pitch(world_size: f64, layer: u32) -> f64 {
    world_size / 2.0 / 2f64.powi(layer.cast_signed())
}
