//! Wavefront OBJ reading and writing.
//!
//! Supports the subset the tiler needs: positions, texture coordinates,
//! normals, polygonal faces, material libraries and material switches.
//! Other statements are ignored on read.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use glam::{DVec2, DVec3};

use crate::error::{TilerError, TilerResult};

/// One corner of a face, as zero-based indices into the mesh arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// A polygonal face.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub vertices: Vec<FaceVertex>,
    /// Material active when the face was declared.
    pub material: Option<String>,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn from_center_size(center: DVec3, size: f64) -> Self {
        let half = DVec3::splat(size / 2.0);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn extents(&self) -> DVec3 {
        self.max - self.min
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Overlap of two boxes, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        min.cmple(max).all().then_some(Aabb { min, max })
    }
}

/// A mesh loaded from an OBJ file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub positions: Vec<DVec3>,
    pub texcoords: Vec<DVec2>,
    pub normals: Vec<DVec3>,
    pub faces: Vec<Face>,
    /// Material libraries referenced with `mtllib`.
    pub material_libraries: Vec<String>,
}

impl ObjMesh {
    /// Read and parse an OBJ file.
    pub fn load(path: &Path) -> TilerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TilerError::io(path, &e))?;
        Self::parse(path, &text)
    }

    /// Parse OBJ text. `path` is only used for error context.
    pub fn parse(path: &Path, text: &str) -> TilerResult<Self> {
        let mut mesh = ObjMesh::default();
        let mut material = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let error = |detail: String| TilerError::Parse {
                path: path.to_path_buf(),
                line: line_number,
                detail,
            };

            let line = raw_line.split('#').next().unwrap_or("").trim();
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "v" => {
                    let [x, y, z] = parse_floats::<3>(&mut tokens).map_err(error)?;
                    mesh.positions.push(DVec3::new(x, y, z));
                }
                "vt" => {
                    let [u, v] = parse_floats::<2>(&mut tokens).map_err(error)?;
                    mesh.texcoords.push(DVec2::new(u, v));
                }
                "vn" => {
                    let [x, y, z] = parse_floats::<3>(&mut tokens).map_err(error)?;
                    mesh.normals.push(DVec3::new(x, y, z));
                }
                "f" => {
                    let vertices = tokens
                        .map(|token| mesh.parse_face_vertex(token))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(error)?;
                    if vertices.len() < 3 {
                        return Err(error(format!(
                            "face has {} vertices, need at least 3",
                            vertices.len()
                        )));
                    }
                    mesh.faces.push(Face {
                        vertices,
                        material: material.clone(),
                    });
                }
                "mtllib" => {
                    mesh.material_libraries
                        .extend(tokens.map(ToString::to_string));
                }
                "usemtl" => {
                    material = tokens.next().map(ToString::to_string);
                }
                _ => {}
            }
        }

        Ok(mesh)
    }

    /// Parse a `v`, `v/vt`, `v//vn` or `v/vt/vn` face token.
    fn parse_face_vertex(&self, token: &str) -> Result<FaceVertex, String> {
        let mut parts = token.split('/');
        let position = parts
            .next()
            .ok_or_else(|| format!("empty face vertex '{token}'"))
            .and_then(|part| resolve_index(part, self.positions.len()))?;
        let texcoord = match parts.next() {
            None | Some("") => None,
            Some(part) => Some(resolve_index(part, self.texcoords.len())?),
        };
        let normal = match parts.next() {
            None | Some("") => None,
            Some(part) => Some(resolve_index(part, self.normals.len())?),
        };
        Ok(FaceVertex {
            position,
            texcoord,
            normal,
        })
    }

    /// Bounds of all positions, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold(
            Aabb {
                min: first,
                max: first,
            },
            |bounds, &p| Aabb {
                min: bounds.min.min(p),
                max: bounds.max.max(p),
            },
        ))
    }

    /// Triangles of every face, fan-triangulated.
    pub fn triangles(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            let first = self.positions[face.vertices[0].position];
            face.vertices.windows(2).skip(1).map(move |pair| {
                [
                    first,
                    self.positions[pair[0].position],
                    self.positions[pair[1].position],
                ]
            })
        })
    }

    /// Serialize to OBJ text, keeping only referenced vertices.
    pub fn to_obj_string(&self) -> String {
        let mut positions = IndexRemap::default();
        let mut texcoords = IndexRemap::default();
        let mut normals = IndexRemap::default();

        for corner in self.faces.iter().flat_map(|face| &face.vertices) {
            positions.insert(corner.position);
            if let Some(t) = corner.texcoord {
                texcoords.insert(t);
            }
            if let Some(n) = corner.normal {
                normals.insert(n);
            }
        }

        let mut out = String::new();
        for library in &self.material_libraries {
            let _ = writeln!(out, "mtllib {library}");
        }
        for &i in &positions.order {
            let p = self.positions[i];
            let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
        }
        for &i in &texcoords.order {
            let t = self.texcoords[i];
            let _ = writeln!(out, "vt {} {}", t.x, t.y);
        }
        for &i in &normals.order {
            let n = self.normals[i];
            let _ = writeln!(out, "vn {} {} {}", n.x, n.y, n.z);
        }

        let mut material: Option<&str> = None;
        for face in &self.faces {
            if face.material.as_deref() != material {
                material = face.material.as_deref();
                if let Some(name) = material {
                    let _ = writeln!(out, "usemtl {name}");
                }
            }

            out.push('f');
            for corner in &face.vertices {
                let _ = write!(out, " {}", positions.get(corner.position));
                match (corner.texcoord, corner.normal) {
                    (None, None) => {}
                    (Some(t), None) => {
                        let _ = write!(out, "/{}", texcoords.get(t));
                    }
                    (None, Some(n)) => {
                        let _ = write!(out, "//{}", normals.get(n));
                    }
                    (Some(t), Some(n)) => {
                        let _ = write!(out, "/{}/{}", texcoords.get(t), normals.get(n));
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    /// Write the mesh to `path`.
    pub fn save(&self, path: &Path) -> TilerResult<()> {
        std::fs::write(path, self.to_obj_string()).map_err(|e| TilerError::io(path, &e))
    }
}

/// Maps old indices to dense one-based OBJ indices in first-use order.
#[derive(Default)]
struct IndexRemap {
    order: Vec<usize>,
    index: HashMap<usize, usize>,
}

impl IndexRemap {
    fn insert(&mut self, old: usize) {
        if !self.index.contains_key(&old) {
            self.order.push(old);
            self.index.insert(old, self.order.len());
        }
    }

    fn get(&self, old: usize) -> usize {
        self.index[&old]
    }
}

/// Parse exactly `N` floats; extra components (such as `w`) are ignored.
fn parse_floats<'a, const N: usize>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<[f64; N], String> {
    let mut values = [0.0; N];
    for value in &mut values {
        let token = tokens
            .next()
            .ok_or_else(|| format!("expected {N} components"))?;
        *value = token
            .parse()
            .map_err(|e| format!("invalid number '{token}': {e}"))?;
    }
    Ok(values)
}

/// Resolve a one-based (or negative, relative) OBJ index against `len` elements.
fn resolve_index(token: &str, len: usize) -> Result<usize, String> {
    let value: i64 = token
        .parse()
        .map_err(|e| format!("invalid index '{token}': {e}"))?;
    let len_i64 = i64::try_from(len).map_err(|e| e.to_string())?;

    let resolved = match value {
        0 => return Err("index 0 is not valid in OBJ".to_string()),
        v if v > 0 => v - 1,
        v => len_i64 + v,
    };
    if resolved < 0 || resolved >= len_i64 {
        return Err(format!("index {value} out of range for {len} elements"));
    }
    usize::try_from(resolved).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_parse_quad() {
        let mesh = ObjMesh::parse(Path::new("quad.obj"), QUAD).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.texcoords.len(), 4);
        assert_eq!(mesh.normals.len(), 1);
        assert_eq!(mesh.material_libraries, vec!["quad.mtl".to_string()]);
        assert_eq!(mesh.faces.len(), 1);

        let face = &mesh.faces[0];
        assert_eq!(face.material.as_deref(), Some("brick"));
        assert_eq!(
            face.vertices[2],
            FaceVertex {
                position: 2,
                texcoord: Some(2),
                normal: Some(0)
            }
        );
        assert_eq!(mesh.triangles().count(), 2);
    }

    #[test]
    fn test_parse_relative_and_partial_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf -3//1 -2//1 -1//1\nf 1 2 3\n";
        let mesh = ObjMesh::parse(Path::new("tri.obj"), text).unwrap();
        assert_eq!(mesh.faces[0].vertices[0].position, 0);
        assert_eq!(mesh.faces[0].vertices[2].position, 2);
        assert_eq!(mesh.faces[0].vertices[1].normal, Some(0));
        assert_eq!(mesh.faces[1].vertices[1].texcoord, None);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let text = "v 0 0 0\nv 1 0\n";
        let err = ObjMesh::parse(Path::new("bad.obj"), text).unwrap_err();
        assert!(matches!(err, TilerError::Parse { line: 2, .. }));

        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n";
        let err = ObjMesh::parse(Path::new("bad.obj"), text).unwrap_err();
        assert!(matches!(err, TilerError::Parse { line: 4, .. }));
    }

    #[test]
    fn test_write_drops_unreferenced_vertices() {
        let text = "v 9 9 9\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl a\nf 2 3 4\n";
        let mesh = ObjMesh::parse(Path::new("tri.obj"), text).unwrap();
        let written = mesh.to_obj_string();

        assert!(!written.contains("v 9 9 9"));
        assert!(written.contains("usemtl a\nf 1 2 3\n"));

        let reparsed = ObjMesh::parse(Path::new("tri.obj"), &written).unwrap();
        assert_eq!(reparsed.positions.len(), 3);
        assert_eq!(reparsed.faces.len(), 1);
    }

    #[test]
    fn test_bounds_and_intersection() {
        let mesh = ObjMesh::parse(Path::new("quad.obj"), QUAD).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, DVec3::ZERO);
        assert_eq!(bounds.max, DVec3::new(1.0, 1.0, 0.0));

        let cell = Aabb::from_center_size(DVec3::new(1.0, 1.0, 0.0), 1.0);
        let overlap = bounds.intersection(&cell).unwrap();
        assert_eq!(overlap.min, DVec3::new(0.5, 0.5, 0.0));
        assert_eq!(overlap.max, DVec3::new(1.0, 1.0, 0.0));

        let far = Aabb::from_center_size(DVec3::splat(10.0), 1.0);
        assert!(bounds.intersection(&far).is_none());
        assert!(ObjMesh::default().bounds().is_none());
    }
}
