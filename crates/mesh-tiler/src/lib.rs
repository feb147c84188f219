//! Offline LOD tiler for textured OBJ models.
//!
//! A model is split into layers of increasing detail. Each layer is cut
//! into cubic tiles along the surface voxels of the model, with the voxel
//! pitch halving from one layer to the next. Tiles, the model's materials
//! and a manifest are written to `<output_root>/<model_name>/`.

pub mod config;
pub mod error;
pub mod manifest;
pub mod obj;
pub mod pool;
pub mod textures;
pub mod voxel;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{TilerConfig, voxel_pitch};
use error::{TilerError, TilerResult};
use manifest::{LayerEntry, Manifest, TileEntry};
use glam::IVec3;
use obj::{Aabb, ObjMesh};
use pool::{PoolReport, WorkerPool};
use voxel::{VoxelGrid, crop, tile_file_name};

/// Summary of a tiling run.
#[derive(Debug, Clone)]
pub struct TilerReport {
    pub output_dir: PathBuf,
    pub manifest: Manifest,
    pub tasks: PoolReport,
}

/// Name of the model: the input file stem.
fn model_name(input: &Path) -> TilerResult<String> {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| TilerError::InvalidConfig {
            detail: format!("cannot derive a model name from {}", input.display()),
        })
}

/// Tiles of one layer with the bounds each is cropped to.
///
/// Cells that do not overlap the model bounds produce no tile.
fn layer_tiles(
    layer: u32,
    grid: &VoxelGrid,
    cells: &[IVec3],
    bounds: &Aabb,
) -> Vec<(TileEntry, Aabb)> {
    cells
        .iter()
        .filter_map(|&cell| {
            let tile_bounds = grid.cell_bounds(cell).intersection(bounds)?;
            let tile = TileEntry {
                file: tile_file_name(layer, cell),
                cell: cell.to_array(),
                center: grid.cell_center(cell).to_array(),
            };
            Some((tile, tile_bounds))
        })
        .collect()
}

/// Tile the model described by `config`.
pub fn run(config: &TilerConfig) -> TilerResult<TilerReport> {
    config.validate()?;

    let name = model_name(&config.input)?;
    let output_dir = config.output_root.join(&name);
    std::fs::create_dir_all(&output_dir).map_err(|e| TilerError::io(&output_dir, &e))?;

    let mesh = Arc::new(ObjMesh::load(&config.input)?);
    let bounds = match mesh.bounds() {
        Some(bounds) if !mesh.faces.is_empty() => bounds,
        _ => {
            return Err(TilerError::EmptyMesh {
                path: config.input.clone(),
            });
        }
    };
    let world_size = bounds.extents().max_element();
    tracing::info!(
        "Tiling {name}: {} vertices, {} faces, world size {world_size:.3}",
        mesh.positions.len(),
        mesh.faces.len()
    );

    let pool = WorkerPool::new(config.num_threads);

    let input_dir = config
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let libraries = mesh.material_libraries.clone();
    let materials_output = output_dir.clone();
    pool.submit("copy materials", move || {
        let copied = textures::copy_materials(&input_dir, &libraries, &materials_output)?;
        tracing::info!("Copied {copied} material files");
        Ok(())
    });

    // Without decimation every layer cuts the full-resolution mesh.
    let mut layers = Vec::new();
    for index in 0..config.num_layers {
        let keep_fraction = config.keep_fraction(index);
        let pitch = voxel_pitch(world_size, index);
        let grid = VoxelGrid {
            origin: bounds.min,
            pitch,
        };
        let cells = grid.surface_cells(&mesh);
        tracing::info!(
            "Layer {index}: keep {:.1}%, pitch {pitch:.3}, {} tiles",
            keep_fraction * 100.0,
            cells.len()
        );

        let mut tiles = Vec::with_capacity(cells.len());
        for (tile, tile_bounds) in layer_tiles(index, &grid, &cells, &bounds) {
            let mesh = Arc::clone(&mesh);
            let path = output_dir.join(&tile.file);
            pool.submit(tile.file.clone(), move || {
                crop(&mesh, &tile_bounds).save(&path)
            });
            tiles.push(tile);
        }

        layers.push(LayerEntry {
            index,
            keep_fraction,
            voxel_pitch: pitch,
            tiles,
        });
    }

    let tasks = pool.finish();
    let manifest = Manifest {
        model: name,
        world_size,
        bounds_min: bounds.min.to_array(),
        bounds_max: bounds.max.to_array(),
        layers,
    };
    manifest.save(&output_dir)?;

    tracing::info!(
        "Wrote {} tiles to {} ({} tasks failed)",
        manifest.tile_count(),
        output_dir.display(),
        tasks.failed
    );
    Ok(TilerReport {
        output_dir,
        manifest,
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mesh-tiler-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_writes_tiles_materials_and_manifest() {
        let root = scratch_dir("run");
        let input = root.join("in");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(
            input.join("better_model.obj"),
            "mtllib model.mtl\nv 0 0 0\nv 4 0 0\nv 4 4 0\nv 0 4 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             usemtl ground\nf 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();
        std::fs::write(input.join("model.mtl"), "newmtl ground\nmap_Kd ground.jpg\n").unwrap();
        std::fs::write(input.join("ground.jpg"), b"jpg").unwrap();

        let mut config = TilerConfig::new(input.join("better_model.obj"), root.join("out"));
        config.num_layers = 2;
        config.num_threads = 2;
        let report = run(&config).unwrap();

        let out = root.join("out").join("better_model");
        assert_eq!(report.output_dir, out);
        assert!(out.join("model.mtl").exists());
        assert!(out.join("ground.jpg").exists());

        // Layer 0 cuts at pitch 2 from the model's min corner.
        let layer0 = &report.manifest.layers[0];
        assert_eq!(layer0.voxel_pitch, 2.0);
        assert!(layer0.tiles.iter().any(|tile| tile.file == "tile_0_1_1_0.obj"));
        assert_eq!(report.manifest.layers[1].voxel_pitch, 1.0);
        assert!((report.manifest.layers[1].keep_fraction - 0.8).abs() < 1e-12);

        for layer in &report.manifest.layers {
            for tile in &layer.tiles {
                assert!(out.join(&tile.file).exists(), "missing {}", tile.file);
            }
        }
        assert_eq!(report.tasks.failed, 0);

        let manifest: Manifest =
            serde_json::from_str(&std::fs::read_to_string(out.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.model, "better_model");
        assert_eq!(manifest.tile_count(), report.manifest.tile_count());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_cells_outside_the_model_get_no_tile() {
        let bounds = Aabb {
            min: glam::DVec3::ZERO,
            max: glam::DVec3::splat(4.0),
        };
        let grid = VoxelGrid {
            origin: bounds.min,
            pitch: 2.0,
        };
        let cells = [IVec3::new(1, 1, 0), IVec3::new(10, 0, 0)];

        let tiles = layer_tiles(0, &grid, &cells, &bounds);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].0.file, "tile_0_1_1_0.obj");
        assert_eq!(tiles[0].1.min, glam::DVec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_run_rejects_mesh_without_faces() {
        let root = scratch_dir("empty");
        std::fs::write(root.join("points.obj"), "v 0 0 0\nv 1 1 1\n").unwrap();

        let config = TilerConfig::new(root.join("points.obj"), root.join("out"));
        assert!(matches!(run(&config), Err(TilerError::EmptyMesh { .. })));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
