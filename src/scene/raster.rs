use image::{Rgb, RgbImage};
use nalgebra::{Isometry3, Perspective3};

use crate::math::{Point3, Vector3, TOLERANCE};
use crate::mesh::SurfaceMesh;

use super::{Camera, Light};

/// Fraction of the base color visible without direct light.
const AMBIENT: f64 = 0.15;

/// An evaluated mesh paired with its diffuse color.
pub(super) struct ShadedMesh {
    pub mesh: SurfaceMesh,
    pub color: [f32; 4],
}

/// Depth-buffered flat-shaded triangle rasterizer.
///
/// Faces are lit two-sided with Lambert shading, each light weighted by its
/// share of the total energy. With no lights the camera acts as a headlight.
pub(super) struct Rasterizer {
    width: u32,
    height: u32,
    background: [f32; 4],
}

impl Rasterizer {
    pub fn new(width: u32, height: u32, background: [f32; 4]) -> Self {
        Self {
            width,
            height,
            background,
        }
    }

    pub fn execute(&self, camera: &Camera, meshes: &[ShadedMesh], lights: &[&Light]) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, to_rgb(self.background, 1.0));
        let mut depth = vec![f64::INFINITY; self.width as usize * self.height as usize];

        let view = Isometry3::look_at_rh(&camera.position, &camera.target, &camera.view_up());
        let distance = (camera.target - camera.position).norm().max(TOLERANCE);
        let near = distance * 0.01;
        let far = distance * 10.0;
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let projection = Perspective3::new(w / h, camera.fov_y, near, far);

        for shaded in meshes {
            let mesh = &shaded.mesh;
            for (f, face) in mesh.faces.iter().enumerate() {
                let Some(normal) = mesh.face_normal(f).try_normalize(TOLERANCE) else {
                    continue;
                };
                let world = face.map(|i| mesh.vertices[i as usize]);
                let eye = world.map(|p| view.transform_point(&p));
                if eye.iter().any(|p| p.z > -near) {
                    continue;
                }
                let screen = eye.map(|p| {
                    let ndc = projection.project_point(&p);
                    [(ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h, ndc.z]
                });

                let intensity = shade(&world, normal, camera, lights);
                let color = to_rgb(shaded.color, intensity);
                self.fill(&mut image, &mut depth, &screen, color);
            }
        }

        image
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::similar_names
    )]
    fn fill(&self, image: &mut RgbImage, depth: &mut [f64], tri: &[[f64; 3]; 3], color: Rgb<u8>) {
        let [s0, s1, s2] = tri;
        let area = edge(s0, s1, s2);
        if area.abs() < TOLERANCE {
            return;
        }

        let xs = [s0[0], s1[0], s2[0]];
        let ys = [s0[1], s1[1], s2[1]];
        let Some((x0, x1)) = span(&xs, self.width) else {
            return;
        };
        let Some((y0, y1)) = span(&ys, self.height) else {
            return;
        };

        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = [f64::from(x) + 0.5, f64::from(y) + 0.5, 0.0];
                let b0 = edge(s1, s2, &p) / area;
                let b1 = edge(s2, s0, &p) / area;
                let b2 = edge(s0, s1, &p) / area;
                if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                    continue;
                }
                let z = b0 * s0[2] + b1 * s1[2] + b2 * s2[2];
                let idx = y as usize * self.width as usize + x as usize;
                if z < depth[idx] {
                    depth[idx] = z;
                    image.put_pixel(x, y, color);
                }
            }
        }
    }
}

/// Two-sided Lambert intensity of a face, including the ambient term.
fn shade(world: &[Point3; 3], normal: Vector3, camera: &Camera, lights: &[&Light]) -> f64 {
    let centroid = Point3::from((world[0].coords + world[1].coords + world[2].coords) / 3.0);
    let to_eye = camera.position - centroid;
    let normal = if normal.dot(&to_eye) < 0.0 { -normal } else { normal };

    let lambert = |dir: Vector3| {
        dir.try_normalize(TOLERANCE)
            .map_or(0.0, |d| normal.dot(&d).max(0.0))
    };

    let total: f64 = lights.iter().map(|l| f64::from(l.energy.max(0.0))).sum();
    let diffuse = if total > 0.0 {
        lights
            .iter()
            .map(|l| f64::from(l.energy.max(0.0)) / total * lambert(l.position - centroid))
            .sum()
    } else {
        lambert(to_eye)
    };

    AMBIENT + (1.0 - AMBIENT) * diffuse
}

/// Signed doubled area of `(a, b, p)` in screen space.
fn edge(a: &[f64; 3], b: &[f64; 3], p: &[f64; 3]) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Pixel range covered by `coords`, clipped to `[0, len)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(coords: &[f64; 3], len: u32) -> Option<(u32, u32)> {
    let lo = coords.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = coords.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(hi >= 0.0 && lo < f64::from(len)) {
        return None;
    }
    let start = lo.floor().max(0.0) as u32;
    let end = (hi.ceil() as u32).min(len - 1);
    Some((start, end))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_rgb(color: [f32; 4], intensity: f64) -> Rgb<u8> {
    Rgb([0, 1, 2].map(|c| {
        let v = (f64::from(color[c]) * intensity).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facing_square(z: f64) -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Point3::new(-1.0, -1.0, z),
                Point3::new(1.0, -1.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(-1.0, 1.0, z),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn top_camera() -> Camera {
        Camera::tracking("Top", Point3::new(0.0, 0.0, 10.0), Point3::origin())
    }

    #[test]
    fn empty_scene_is_background() {
        let img = Rasterizer::new(8, 6, [0.0, 0.0, 0.0, 1.0]).execute(&top_camera(), &[], &[]);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn nearer_face_wins_depth_test() {
        let meshes = [
            ShadedMesh {
                mesh: facing_square(0.0),
                color: [1.0, 0.0, 0.0, 1.0],
            },
            ShadedMesh {
                mesh: facing_square(2.0),
                color: [0.0, 0.0, 1.0, 1.0],
            },
        ];
        let img = Rasterizer::new(16, 16, [0.0; 4]).execute(&top_camera(), &meshes, &[]);
        let center = img.get_pixel(8, 8).0;
        assert_eq!(center[0], 0);
        assert!(center[2] > 200);
    }

    #[test]
    fn back_side_is_lit_too() {
        let mut mesh = facing_square(0.0);
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        let meshes = [ShadedMesh {
            mesh,
            color: [1.0, 1.0, 1.0, 1.0],
        }];
        let img = Rasterizer::new(16, 16, [0.0; 4]).execute(&top_camera(), &meshes, &[]);
        assert_eq!(img.get_pixel(8, 8).0, [255, 255, 255]);
    }

    #[test]
    fn faces_behind_camera_are_culled() {
        let meshes = [ShadedMesh {
            mesh: facing_square(20.0),
            color: [1.0, 1.0, 1.0, 1.0],
        }];
        let img = Rasterizer::new(8, 8, [0.0; 4]).execute(&top_camera(), &meshes, &[]);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
