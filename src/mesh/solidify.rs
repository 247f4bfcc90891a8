use std::collections::HashMap;

use super::SurfaceMesh;

/// Gives a surface thickness by adding an inner shell offset against the
/// vertex normals.
///
/// The inner shell has reversed winding. With `rim` enabled, open boundary
/// edges are bridged to the inner shell by quads.
pub struct Solidify {
    thickness: f64,
    rim: bool,
}

impl Solidify {
    /// Creates a new `Solidify` operation.
    #[must_use]
    pub fn new(thickness: f64, rim: bool) -> Self {
        Self { thickness, rim }
    }

    /// Executes the thickening, returning the combined shell.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self, mesh: &SurfaceMesh) -> SurfaceMesh {
        let mut source = mesh.clone();
        if source.normals.len() != source.vertices.len() {
            source.compute_normals();
        }

        let offset = source.vertices.len() as u32;
        let inner_vertices: Vec<_> = source
            .vertices
            .iter()
            .zip(&source.normals)
            .map(|(v, n)| v - n * self.thickness)
            .collect();

        let mut vertices = source.vertices.clone();
        vertices.extend(inner_vertices);
        let mut faces = source.faces.clone();
        faces.extend(
            source
                .faces
                .iter()
                .map(|&[a, b, c]| [a + offset, c + offset, b + offset]),
        );

        if self.rim {
            for (a, b) in boundary_edges(&source.faces) {
                let (ia, ib) = (a + offset, b + offset);
                faces.push([b, a, ia]);
                faces.push([b, ia, ib]);
            }
        }

        SurfaceMesh::new(vertices, faces)
    }
}

/// Directed edges (in face order) that belong to exactly one face, sorted for
/// deterministic output.
fn boundary_edges(faces: &[[u32; 3]]) -> Vec<(u32, u32)> {
    let mut uses: HashMap<(u32, u32), (usize, (u32, u32))> = HashMap::new();
    for face in faces {
        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            let key = (a.min(b), a.max(b));
            uses.entry(key).or_insert((0, (a, b))).0 += 1;
        }
    }
    let mut edges: Vec<(u32, u32)> = uses
        .into_values()
        .filter(|&(count, _)| count == 1)
        .map(|(_, edge)| edge)
        .collect();
    edges.sort_unstable();
    edges
}
