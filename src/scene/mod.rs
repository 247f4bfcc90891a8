//! Scene collaborator interface and an in-memory implementation.
//!
//! The pipeline never builds renderable objects itself. It hands meshes,
//! lights and cameras to a [`SceneGraph`] and asks it to render. Host
//! applications implement the trait over their own scene; [`SceneStore`] is a
//! self-contained implementation with a simple preview rasterizer.

mod raster;
mod store;

pub use store::{MeshObject, ObjectKind, SceneObject, SceneStore};

use std::path::Path;

use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::mesh::SurfaceMesh;

slotmap::new_key_type! {
    /// Unique identifier for an object in a scene.
    pub struct ObjectId;
}

/// Surface appearance assigned to a mesh object.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Diffuse RGBA color in `[0, 1]`.
    pub base_color: [f32; 4],
    /// Diffuse roughness.
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "T1_Material".into(),
            base_color: [0.9, 0.9, 0.85, 1.0],
            roughness: 0.3,
        }
    }
}

/// A deferred mesh operator, evaluated in insertion order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modifier {
    /// Laplacian smoothing.
    Smooth { factor: f64, iterations: usize },
    /// Shell thickening with a rim on open boundaries.
    Solidify { thickness: f64 },
}

/// An area light.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light name.
    pub name: String,
    /// World-space position.
    pub position: Point3,
    /// Emitted power.
    pub energy: f32,
}

/// A perspective camera that always looks at `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera name.
    pub name: String,
    /// World-space position.
    pub position: Point3,
    /// Tracked point.
    pub target: Point3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
}

impl Camera {
    /// Default vertical field of view (about 39.6°, a 50 mm lens on a 36 mm
    /// sensor).
    pub const DEFAULT_FOV_Y: f64 = 0.691_150_383_789_754_6;

    /// Creates a camera tracking `target` with the default field of view.
    #[must_use]
    pub fn tracking(name: impl Into<String>, position: Point3, target: Point3) -> Self {
        Self {
            name: name.into(),
            position,
            target,
            fov_y: Self::DEFAULT_FOV_Y,
        }
    }

    /// World up vector for the view: +Z, or +Y when looking straight along Z.
    #[must_use]
    pub fn view_up(&self) -> Vector3 {
        let dir = self.target - self.position;
        if dir.cross(&Vector3::z()).norm() <= 1e-9 * dir.norm().max(1.0) {
            Vector3::y()
        } else {
            Vector3::z()
        }
    }
}

/// The operations the pipeline needs from a scene.
///
/// Mesh-side calls mirror what a modeling host offers for a freshly imported
/// surface; render-side calls cover lighting, cameras and still rendering.
pub trait SceneGraph {
    /// Materializes a mesh object and returns its handle.
    fn create_mesh(&mut self, name: &str, mesh: SurfaceMesh) -> ObjectId;

    /// Assigns a material.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn set_material(&mut self, id: ObjectId, material: &Material) -> Result<()>;

    /// Enables or disables smooth shading.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn set_smooth_shading(&mut self, id: ObjectId, smooth: bool) -> Result<()>;

    /// Moves the object origin to the center of its bounds and places the
    /// object at the world origin.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn recenter_origin(&mut self, id: ObjectId) -> Result<()>;

    /// Appends a smoothing modifier.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn add_smooth_modifier(&mut self, id: ObjectId, factor: f64, iterations: usize) -> Result<()>;

    /// Appends a solidify modifier.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn add_solidify_modifier(&mut self, id: ObjectId, thickness: f64) -> Result<()>;

    /// Sets the object scale.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a mesh object.
    fn set_scale(&mut self, id: ObjectId, sx: f64, sy: f64, sz: f64) -> Result<()>;

    /// Sets the world background color.
    fn set_background(&mut self, color: [f32; 4]);

    /// Adds a light and returns its handle.
    fn add_light(&mut self, light: Light) -> ObjectId;

    /// Adds a camera and returns its handle.
    fn add_camera(&mut self, camera: Camera) -> ObjectId;

    /// Makes `id` the active scene camera.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a camera.
    fn set_active_camera(&mut self, id: ObjectId) -> Result<()>;

    /// Renders the scene through `camera` and writes the image to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `camera` is not a camera or the image cannot be
    /// written.
    fn render(&mut self, camera: ObjectId, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axial_camera_uses_y_up() {
        let cam = Camera::tracking("Axial", Point3::new(0.0, 0.0, 210.0), Point3::origin());
        assert_eq!(cam.view_up(), Vector3::y());
    }

    #[test]
    fn side_camera_uses_z_up() {
        let cam = Camera::tracking("Sagittal", Point3::new(210.0, 0.0, 0.0), Point3::origin());
        assert_eq!(cam.view_up(), Vector3::z());
    }

    #[test]
    fn default_material_is_bone_white() {
        let m = Material::default();
        assert_eq!(m.base_color, [0.9, 0.9, 0.85, 1.0]);
        assert!((m.roughness - 0.3).abs() < f32::EPSILON);
    }
}
