use std::collections::HashMap;
use std::sync::OnceLock;

use ndarray::Array3;

use crate::error::ExtractionError;
use crate::math::Point3;

use super::SurfaceMesh;

/// Cube edges as `(start corner, axis)`. The start corner has bit `axis`
/// clear; the end corner is `start | 1 << axis`.
///
/// Corner `c` is offset from the cube origin by `(c & 1, c >> 1 & 1, c >> 2 & 1)`
/// along `(axis0, axis1, axis2)`.
const EDGES: [(usize, usize); 12] = [
    (0, 0),
    (2, 0),
    (4, 0),
    (6, 0),
    (0, 1),
    (1, 1),
    (4, 1),
    (5, 1),
    (0, 2),
    (1, 2),
    (2, 2),
    (3, 2),
];

/// Triangles (as cube-edge triples) for each of the 256 corner configurations.
type CaseTable = Vec<Vec<[usize; 3]>>;

/// Extracts an isosurface from a scalar field with marching cubes.
///
/// Vertices are expressed in voxel index space `(axis0, axis1, axis2)` and
/// placed by linear interpolation along cube edges; vertices on shared edges
/// are emitted once. Faces are wound so their normals point from values above
/// the level toward values below it. Ambiguous cube faces always separate the
/// above-level corners, so neighboring cubes agree and the surface is closed
/// wherever it does not reach the field border.
pub struct MarchingCubes {
    level: f32,
}

impl MarchingCubes {
    /// Creates a new `MarchingCubes` operation at the given iso-level.
    #[must_use]
    pub fn new(level: f32) -> Self {
        Self { level }
    }

    /// Executes the extraction.
    ///
    /// # Errors
    ///
    /// Returns an error if any axis is shorter than 2 samples, if the level
    /// lies outside the field's value range, or if no triangle is produced.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn execute(&self, field: &Array3<f32>) -> Result<SurfaceMesh, ExtractionError> {
        let (n0, n1, n2) = field.dim();
        if n0 < 2 || n1 < 2 || n2 < 2 {
            return Err(ExtractionError::VolumeTooSmall {
                shape: [n0, n1, n2],
            });
        }

        let (min, max) = field
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let level = self.level;
        if !(min <= level && level <= max) {
            return Err(ExtractionError::LevelOutOfRange { level, min, max });
        }

        let table = case_table();
        let mut vertex_of: HashMap<[usize; 4], u32> = HashMap::new();
        let mut vertices: Vec<Point3> = Vec::new();
        let mut faces: Vec<[u32; 3]> = Vec::new();

        for i0 in 0..n0 - 1 {
            for i1 in 0..n1 - 1 {
                for i2 in 0..n2 - 1 {
                    let mut values = [0.0f32; 8];
                    let mut case = 0usize;
                    for (c, value) in values.iter_mut().enumerate() {
                        let [d0, d1, d2] = corner_offset(c);
                        *value = field[[i0 + d0, i1 + d1, i2 + d2]];
                        if *value > level {
                            case |= 1 << c;
                        }
                    }

                    for tri in &table[case] {
                        let mut face = [0u32; 3];
                        for (slot, &edge) in face.iter_mut().zip(tri) {
                            let (start, axis) = EDGES[edge];
                            let [d0, d1, d2] = corner_offset(start);
                            let key = [i0 + d0, i1 + d1, i2 + d2, axis];
                            *slot = *vertex_of.entry(key).or_insert_with(|| {
                                let va = values[start];
                                let vb = values[start | 1 << axis];
                                let t = f64::from((level - va) / (vb - va));
                                let mut p = Point3::new(key[0] as f64, key[1] as f64, key[2] as f64);
                                p[axis] += t;
                                vertices.push(p);
                                (vertices.len() - 1) as u32
                            });
                        }
                        faces.push(face);
                    }
                }
            }
        }

        if faces.is_empty() {
            return Err(ExtractionError::EmptySurface);
        }
        tracing::debug!(
            vertices = vertices.len(),
            faces = faces.len(),
            level,
            "marching cubes finished"
        );
        Ok(SurfaceMesh::new(vertices, faces))
    }
}

fn corner_offset(c: usize) -> [usize; 3] {
    [c & 1, (c >> 1) & 1, (c >> 2) & 1]
}

fn edge_between(p: usize, q: usize) -> usize {
    let axis = (p ^ q).trailing_zeros() as usize;
    let start = p.min(q);
    EDGES
        .iter()
        .position(|&e| e == (start, axis))
        .unwrap_or_default()
}

/// The six cube faces as corner loops, counter-clockwise seen from outside.
fn face_loops() -> [[usize; 4]; 6] {
    let mut loops = [[0; 4]; 6];
    for axis in 0..3 {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        for side in 0..2 {
            // (u, v) order is counter-clockwise about +axis; reverse it for the
            // face whose outward normal is -axis.
            let order: [(usize, usize); 4] = if side == 1 {
                [(0, 0), (1, 0), (1, 1), (0, 1)]
            } else {
                [(0, 0), (0, 1), (1, 1), (1, 0)]
            };
            loops[axis * 2 + side] =
                order.map(|(cu, cv)| (side << axis) | (cu << u) | (cv << v));
        }
    }
    loops
}

fn case_table() -> &'static CaseTable {
    static TABLE: OnceLock<CaseTable> = OnceLock::new();
    TABLE.get_or_init(|| (0..256).map(triangulate_case).collect())
}

/// Builds the triangles for one corner configuration.
///
/// On every cube face the crossing edges are visited counter-clockwise (seen
/// from outside). Each edge entering an above-level corner is joined to the
/// next edge leaving one, giving directed segments; chaining them across
/// faces yields closed polygons which are fanned into triangles.
fn triangulate_case(case: usize) -> Vec<[usize; 3]> {
    let above = |c: usize| case & (1 << c) != 0;
    let mut next: [Option<usize>; 12] = [None; 12];

    for corners in face_loops() {
        let mut crossings: Vec<(usize, bool)> = Vec::with_capacity(4);
        for i in 0..4 {
            let (p, q) = (corners[i], corners[(i + 1) % 4]);
            if above(p) != above(q) {
                crossings.push((edge_between(p, q), above(q)));
            }
        }
        let k = crossings.len();
        for j in 0..k {
            let (edge, entering) = crossings[j];
            if entering {
                next[edge] = Some(crossings[(j + 1) % k].0);
            }
        }
    }

    let mut triangles = Vec::new();
    let mut visited = [false; 12];
    for start in 0..12 {
        if visited[start] || next[start].is_none() {
            continue;
        }
        let mut polygon = Vec::new();
        let mut edge = start;
        while !visited[edge] {
            visited[edge] = true;
            polygon.push(edge);
            match next[edge] {
                Some(n) => edge = n,
                None => break,
            }
        }
        for i in 1..polygon.len().saturating_sub(1) {
            triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
    }
    triangles
}
