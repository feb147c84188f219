//! Surface voxelization and per-cell cropping.

use std::collections::HashSet;

use glam::{DVec3, IVec3};

use crate::obj::{Aabb, Face, ObjMesh};

/// Upper bound on subdivisions along a triangle edge.
const MAX_SUBDIVISIONS: u32 = 4096;

/// A regular grid of cubic cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    /// Center of cell `(0, 0, 0)`.
    pub origin: DVec3,
    /// Cell edge length.
    pub pitch: f64,
}

impl VoxelGrid {
    /// Index of the cell containing `point`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_of(&self, point: DVec3) -> IVec3 {
        ((point - self.origin) / self.pitch).round().as_ivec3()
    }

    pub fn cell_center(&self, cell: IVec3) -> DVec3 {
        self.origin + cell.as_dvec3() * self.pitch
    }

    pub fn cell_bounds(&self, cell: IVec3) -> Aabb {
        Aabb::from_center_size(self.cell_center(cell), self.pitch)
    }

    /// Cells touched by the surface of `mesh`, sorted by `(x, y, z)`.
    ///
    /// Each triangle is sampled on a barycentric grid no coarser than half a
    /// cell, so interiors of closed meshes stay empty.
    pub fn surface_cells(&self, mesh: &ObjMesh) -> Vec<IVec3> {
        let mut cells = HashSet::new();
        let spacing = self.pitch / 2.0;

        for [a, b, c] in mesh.triangles() {
            let longest = (b - a)
                .length()
                .max((c - b).length())
                .max((a - c).length());
            let steps = subdivisions(longest, spacing);
            let n = f64::from(steps);

            for i in 0..=steps {
                for j in 0..=(steps - i) {
                    let point = a + (b - a) * (f64::from(i) / n) + (c - a) * (f64::from(j) / n);
                    cells.insert(self.cell_of(point));
                }
            }
        }

        let mut cells: Vec<IVec3> = cells.into_iter().collect();
        cells.sort_unstable_by_key(|cell| (cell.x, cell.y, cell.z));
        cells
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn subdivisions(length: f64, spacing: f64) -> u32 {
    if !(length > 0.0 && spacing > 0.0) {
        return 1;
    }
    ((length / spacing).ceil() as u32).clamp(1, MAX_SUBDIVISIONS)
}

/// Keep only the faces whose every vertex lies inside `bounds`.
///
/// Vertex arrays are shared with the source; unreferenced vertices are
/// dropped when the tile is written.
pub fn crop(mesh: &ObjMesh, bounds: &Aabb) -> ObjMesh {
    let faces: Vec<Face> = mesh
        .faces
        .iter()
        .filter(|face| {
            face.vertices
                .iter()
                .all(|corner| bounds.contains(mesh.positions[corner.position]))
        })
        .cloned()
        .collect();

    ObjMesh {
        positions: mesh.positions.clone(),
        texcoords: mesh.texcoords.clone(),
        normals: mesh.normals.clone(),
        faces,
        material_libraries: mesh.material_libraries.clone(),
    }
}

/// File name of the tile for `cell` on `layer`.
pub fn tile_file_name(layer: u32, cell: IVec3) -> String {
    format!("tile_{layer}_{}_{}_{}.obj", cell.x, cell.y, cell.z)
}
