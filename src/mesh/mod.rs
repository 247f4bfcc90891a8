mod marching_cubes;
mod smooth;
mod solidify;
pub mod stl;

pub use marching_cubes::MarchingCubes;
pub use smooth::LaplacianSmooth;
pub use solidify::Solidify;

use crate::math::{Aabb, Point3, Vector3};

/// Corner indices of the placeholder cube faces, counter-clockwise seen from
/// outside. Corner `c` sits at `(±1, ±1, ±1)` with bit 0 → x, bit 1 → y,
/// bit 2 → z.
const CUBE_QUADS: [[u32; 4]; 6] = [
    [0, 4, 6, 2],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 2, 3, 1],
    [4, 5, 7, 6],
];

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals, either empty or one per vertex.
    pub normals: Vec<Vector3>,
    /// Triangle indices (each triple defines a triangle).
    pub faces: Vec<[u32; 3]>,
}

impl SurfaceMesh {
    /// Creates a mesh from vertices and faces and derives vertex normals.
    #[must_use]
    pub fn new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Self {
        let mut mesh = Self {
            vertices,
            normals: Vec::new(),
            faces,
        };
        mesh.compute_normals();
        mesh
    }

    /// Axis-aligned cube of edge length 2 centered at the origin
    /// (8 vertices, 12 outward-facing triangles).
    #[must_use]
    pub fn placeholder_cube() -> Self {
        let vertices = (0..8u32)
            .map(|c| {
                let coord = |bit: u32| if c & (1 << bit) == 0 { -1.0 } else { 1.0 };
                Point3::new(coord(0), coord(1), coord(2))
            })
            .collect();
        let faces = CUBE_QUADS
            .iter()
            .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
            .collect();
        Self::new(vertices, faces)
    }

    /// Returns `true` if the mesh has no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Returns `true` if every face index refers to an existing vertex and
    /// normals, when present, match the vertex count.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let n = self.vertices.len();
        let normals_ok = self.normals.is_empty() || self.normals.len() == n;
        normals_ok
            && self
                .faces
                .iter()
                .flatten()
                .all(|&i| (i as usize) < n)
    }

    /// Bounding box of the vertices, or `None` for a vertex-less mesh.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Unnormalized normal of face `f` (twice its area in length).
    #[must_use]
    pub fn face_normal(&self, f: usize) -> Vector3 {
        let [a, b, c] = self.faces[f].map(|i| self.vertices[i as usize]);
        (b - a).cross(&(c - a))
    }

    /// Recomputes vertex normals as area-weighted averages of face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.vertices.len()];
        for f in 0..self.faces.len() {
            let n = self.face_normal(f);
            for &i in &self.faces[f] {
                normals[i as usize] += n;
            }
        }
        for n in &mut normals {
            *n = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        }
        self.normals = normals;
    }

    /// Mirrors the mesh by negating one coordinate of every vertex.
    ///
    /// Face winding is left untouched, so the mirror turns every face
    /// inside out; vertex normals are recomputed to follow the winding.
    pub fn flip_axis(&mut self, axis: usize) {
        for v in &mut self.vertices {
            v[axis] = -v[axis];
        }
        self.compute_normals();
    }

    /// Translates every vertex by `offset`.
    pub fn translate(&mut self, offset: &Vector3) {
        for v in &mut self.vertices {
            *v += *offset;
        }
    }

    /// Scales vertices component-wise about the origin.
    pub fn scale(&mut self, factors: &Vector3) {
        for v in &mut self.vertices {
            v.coords.component_mul_assign(factors);
        }
        if factors.iter().all(|&f| f != 0.0) {
            self.compute_normals();
        }
    }

}
