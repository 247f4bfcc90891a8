use crate::math::Vector3;

use super::SurfaceMesh;

/// Laplacian smoothing: each iteration moves every vertex `factor` of the way
/// toward the average of its edge neighbors.
pub struct LaplacianSmooth {
    factor: f64,
    iterations: usize,
}

impl LaplacianSmooth {
    /// Creates a new `LaplacianSmooth` operation.
    #[must_use]
    pub fn new(factor: f64, iterations: usize) -> Self {
        Self { factor, iterations }
    }

    /// Executes the smoothing, returning a new mesh with recomputed normals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self, mesh: &SurfaceMesh) -> SurfaceMesh {
        let neighbors = adjacency(mesh);
        let mut out = mesh.clone();

        for _ in 0..self.iterations {
            let previous = out.vertices.clone();
            for (v, ring) in out.vertices.iter_mut().zip(&neighbors) {
                if ring.is_empty() {
                    continue;
                }
                let sum: Vector3 = ring.iter().map(|&n| previous[n].coords).sum();
                let average = sum / ring.len() as f64;
                v.coords += (average - v.coords) * self.factor;
            }
        }

        out.compute_normals();
        out
    }
}

/// Sorted, de-duplicated edge neighbors of every vertex.
fn adjacency(mesh: &SurfaceMesh) -> Vec<Vec<usize>> {
    let mut rings = vec![Vec::new(); mesh.vertices.len()];
    for face in &mesh.faces {
        for i in 0..3 {
            let a = face[i] as usize;
            let b = face[(i + 1) % 3] as usize;
            rings[a].push(b);
            rings[b].push(a);
        }
    }
    for ring in &mut rings {
        ring.sort_unstable();
        ring.dedup();
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn zero_iterations_keeps_positions() {
        let cube = SurfaceMesh::placeholder_cube();
        let out = LaplacianSmooth::new(0.5, 0).execute(&cube);
        assert_eq!(out.vertices, cube.vertices);
    }

    #[test]
    fn smoothing_shrinks_cube_toward_center() {
        let cube = SurfaceMesh::placeholder_cube();
        let out = LaplacianSmooth::new(0.5, 3).execute(&cube);
        for (before, after) in cube.vertices.iter().zip(&out.vertices) {
            assert!(after.coords.norm() < before.coords.norm());
        }
        // symmetric input keeps its centroid
        let centroid: Vector3 = out.vertices.iter().map(|p| p.coords).sum::<Vector3>() / 8.0;
        assert_relative_eq!(centroid, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn isolated_vertices_do_not_move() {
        let mut mesh = SurfaceMesh::placeholder_cube();
        mesh.vertices.push(Point3::new(9.0, 9.0, 9.0));
        mesh.compute_normals();
        let out = LaplacianSmooth::new(1.0, 2).execute(&mesh);
        assert_eq!(out.vertices[8], Point3::new(9.0, 9.0, 9.0));
    }
}
