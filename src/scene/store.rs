use std::path::Path;

use slotmap::SlotMap;
use tracing::debug;

use crate::error::{RenderError, SceneError};
use crate::math::{Point3, Vector3};
use crate::mesh::{LaplacianSmooth, Solidify, SurfaceMesh};

use super::raster::{Rasterizer, ShadedMesh};
use super::{Camera, Light, Material, Modifier, ObjectId, SceneGraph};

/// Default preview resolution.
const DEFAULT_SIZE: (u32, u32) = (640, 480);

/// A named entry in a [`SceneStore`].
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Object name as given at creation.
    pub name: String,
    /// Object payload.
    pub kind: ObjectKind,
}

/// What a scene object holds.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Mesh(MeshObject),
    Light(Light),
    Camera(Camera),
}

impl ObjectKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "mesh",
            Self::Light(_) => "light",
            Self::Camera(_) => "camera",
        }
    }
}

/// A mesh with its object-level state.
///
/// `mesh` is the base geometry in local coordinates. Modifiers are kept
/// unapplied until [`MeshObject::evaluated`] is called.
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub mesh: SurfaceMesh,
    pub material: Option<Material>,
    pub smooth_shading: bool,
    pub location: Point3,
    pub scale: Vector3,
    pub modifiers: Vec<Modifier>,
}

impl MeshObject {
    fn new(mesh: SurfaceMesh) -> Self {
        Self {
            mesh,
            material: None,
            smooth_shading: false,
            location: Point3::origin(),
            scale: Vector3::repeat(1.0),
            modifiers: Vec::new(),
        }
    }

    /// World-space geometry: modifiers in order, then scale, then location.
    #[must_use]
    pub fn evaluated(&self) -> SurfaceMesh {
        let mut mesh = self.mesh.clone();
        for modifier in &self.modifiers {
            mesh = match *modifier {
                Modifier::Smooth { factor, iterations } => {
                    LaplacianSmooth::new(factor, iterations).execute(&mesh)
                }
                Modifier::Solidify { thickness } => Solidify::new(thickness, true).execute(&mesh),
            };
        }
        mesh.scale(&self.scale);
        mesh.translate(&self.location.coords);
        mesh
    }
}

/// In-memory scene: an arena of meshes, lights and cameras plus a preview
/// renderer.
#[derive(Debug)]
pub struct SceneStore {
    objects: SlotMap<ObjectId, SceneObject>,
    background: [f32; 4],
    active_camera: Option<ObjectId>,
    size: (u32, u32),
}

impl Default for SceneStore {
    fn default() -> Self {
        Self {
            objects: SlotMap::with_key(),
            background: [0.0, 0.0, 0.0, 1.0],
            active_camera: None,
            size: DEFAULT_SIZE,
        }
    }
}

impl SceneStore {
    /// Creates a new, empty scene with the default render size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scene rendering at `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSize`] if either dimension is zero.
    pub fn with_size(width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height }.into());
        }
        Ok(Self {
            size: (width, height),
            ..Self::default()
        })
    }

    /// Render size as `(width, height)`.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Current background color.
    #[must_use]
    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    /// The active camera, if one was set.
    #[must_use]
    pub fn active_camera(&self) -> Option<ObjectId> {
        self.active_camera
    }

    /// Number of objects in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates over all objects.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Returns a reference to an object, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ObjectNotFound`] if `id` is not in the scene.
    pub fn object(&self, id: ObjectId) -> Result<&SceneObject, SceneError> {
        self.objects
            .get(id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("{id:?}")))
    }

    /// Returns the mesh state of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or not a mesh.
    pub fn mesh_object(&self, id: ObjectId) -> Result<&MeshObject, SceneError> {
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Mesh(mesh) => Ok(mesh),
            _ => Err(wrong_kind(object, "mesh")),
        }
    }

    /// Returns the mutable mesh state of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or not a mesh.
    pub fn mesh_object_mut(&mut self, id: ObjectId) -> Result<&mut MeshObject, SceneError> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("{id:?}")))?;
        match object.kind {
            ObjectKind::Mesh(ref mut mesh) => Ok(mesh),
            _ => Err(SceneError::WrongKind {
                name: object.name.clone(),
                expected: "mesh",
            }),
        }
    }

    /// Returns the camera held by an object.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or not a camera.
    pub fn camera(&self, id: ObjectId) -> Result<&Camera, SceneError> {
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Camera(camera) => Ok(camera),
            _ => Err(wrong_kind(object, "camera")),
        }
    }

    /// World-space geometry of a mesh object with all modifiers applied.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or not a mesh.
    pub fn evaluated_mesh(&self, id: ObjectId) -> Result<SurfaceMesh, SceneError> {
        Ok(self.mesh_object(id)?.evaluated())
    }

    fn lights(&self) -> Vec<&Light> {
        self.objects
            .values()
            .filter_map(|o| match &o.kind {
                ObjectKind::Light(light) => Some(light),
                _ => None,
            })
            .collect()
    }

    fn shaded_meshes(&self) -> Vec<ShadedMesh> {
        self.objects
            .values()
            .filter_map(|o| match &o.kind {
                ObjectKind::Mesh(mesh) => Some(ShadedMesh {
                    mesh: mesh.evaluated(),
                    color: mesh
                        .material
                        .as_ref()
                        .map_or([0.8, 0.8, 0.8, 1.0], |m| m.base_color),
                }),
                _ => None,
            })
            .collect()
    }

    fn insert(&mut self, name: &str, kind: ObjectKind) -> ObjectId {
        self.objects.insert(SceneObject {
            name: name.to_owned(),
            kind,
        })
    }
}

fn wrong_kind(object: &SceneObject, expected: &'static str) -> SceneError {
    debug!(name = %object.name, found = object.kind.label(), expected, "scene object kind mismatch");
    SceneError::WrongKind {
        name: object.name.clone(),
        expected,
    }
}

impl SceneGraph for SceneStore {
    fn create_mesh(&mut self, name: &str, mesh: SurfaceMesh) -> ObjectId {
        self.insert(name, ObjectKind::Mesh(MeshObject::new(mesh)))
    }

    fn set_material(&mut self, id: ObjectId, material: &Material) -> crate::Result<()> {
        self.mesh_object_mut(id)?.material = Some(material.clone());
        Ok(())
    }

    fn set_smooth_shading(&mut self, id: ObjectId, smooth: bool) -> crate::Result<()> {
        self.mesh_object_mut(id)?.smooth_shading = smooth;
        Ok(())
    }

    fn recenter_origin(&mut self, id: ObjectId) -> crate::Result<()> {
        let object = self.mesh_object_mut(id)?;
        if let Some(bounds) = object.mesh.bounding_box() {
            object.mesh.translate(&-bounds.center().coords);
        }
        object.location = Point3::origin();
        Ok(())
    }

    fn add_smooth_modifier(&mut self, id: ObjectId, factor: f64, iterations: usize) -> crate::Result<()> {
        self.mesh_object_mut(id)?
            .modifiers
            .push(Modifier::Smooth { factor, iterations });
        Ok(())
    }

    fn add_solidify_modifier(&mut self, id: ObjectId, thickness: f64) -> crate::Result<()> {
        self.mesh_object_mut(id)?
            .modifiers
            .push(Modifier::Solidify { thickness });
        Ok(())
    }

    fn set_scale(&mut self, id: ObjectId, sx: f64, sy: f64, sz: f64) -> crate::Result<()> {
        self.mesh_object_mut(id)?.scale = Vector3::new(sx, sy, sz);
        Ok(())
    }

    fn set_background(&mut self, color: [f32; 4]) {
        self.background = color;
    }

    fn add_light(&mut self, light: Light) -> ObjectId {
        let name = light.name.clone();
        self.insert(&name, ObjectKind::Light(light))
    }

    fn add_camera(&mut self, camera: Camera) -> ObjectId {
        let name = camera.name.clone();
        self.insert(&name, ObjectKind::Camera(camera))
    }

    fn set_active_camera(&mut self, id: ObjectId) -> crate::Result<()> {
        self.camera(id)?;
        self.active_camera = Some(id);
        Ok(())
    }

    fn render(&mut self, camera: ObjectId, path: &Path) -> crate::Result<()> {
        let camera = self.camera(camera)?;
        let (width, height) = self.size;
        let meshes = self.shaded_meshes();
        let lights = self.lights();

        let image = Rasterizer::new(width, height, self.background).execute(camera, &meshes, &lights);
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| RenderError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), width, height, "rendered view");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CraniumError;
    use approx::assert_relative_eq;

    fn offset_cube() -> SurfaceMesh {
        let mut cube = SurfaceMesh::placeholder_cube();
        cube.translate(&Vector3::new(10.0, -4.0, 3.0));
        cube
    }

    #[test]
    fn recenter_moves_bbox_center_to_origin() {
        let mut scene = SceneStore::new();
        let id = scene.create_mesh("T1", offset_cube());
        scene.recenter_origin(id).unwrap();
        let bounds = scene.evaluated_mesh(id).unwrap().bounding_box().unwrap();
        assert_relative_eq!(bounds.center(), Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn scale_applies_after_modifiers() {
        let mut scene = SceneStore::new();
        let id = scene.create_mesh("T1", SurfaceMesh::placeholder_cube());
        scene.set_scale(id, 2.0, 2.0, 2.0).unwrap();
        let bounds = scene.evaluated_mesh(id).unwrap().bounding_box().unwrap();
        assert_relative_eq!(bounds.max, Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn modifiers_evaluate_in_order() {
        let mut scene = SceneStore::new();
        let id = scene.create_mesh("T1", SurfaceMesh::placeholder_cube());
        scene.add_smooth_modifier(id, 0.5, 1).unwrap();
        scene.add_solidify_modifier(id, 0.1).unwrap();
        let mesh = scene.evaluated_mesh(id).unwrap();
        // closed cube: solidify doubles the shell, no rim
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.faces.len(), 24);
        let object = scene.mesh_object(id).unwrap();
        assert_eq!(object.modifiers.len(), 2);
        assert!(matches!(object.modifiers[0], Modifier::Smooth { iterations: 1, .. }));
    }

    #[test]
    fn mesh_calls_reject_cameras() {
        let mut scene = SceneStore::new();
        let cam = scene.add_camera(Camera::tracking("Cam", Point3::new(5.0, 0.0, 0.0), Point3::origin()));
        let err = scene.set_smooth_shading(cam, true).unwrap_err();
        assert!(matches!(
            err,
            CraniumError::Scene(SceneError::WrongKind { expected: "mesh", .. })
        ));
    }

    #[test]
    fn active_camera_must_be_a_camera() {
        let mut scene = SceneStore::new();
        let mesh = scene.create_mesh("T1", SurfaceMesh::placeholder_cube());
        assert!(scene.set_active_camera(mesh).is_err());
        let cam = scene.add_camera(Camera::tracking("Cam", Point3::new(5.0, 0.0, 0.0), Point3::origin()));
        scene.set_active_camera(cam).unwrap();
        assert_eq!(scene.active_camera(), Some(cam));
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            SceneStore::with_size(0, 10),
            Err(CraniumError::Render(RenderError::InvalidSize { .. }))
        ));
    }

    #[test]
    fn render_writes_png_of_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = SceneStore::with_size(32, 24).unwrap();
        let mesh = scene.create_mesh("T1", SurfaceMesh::placeholder_cube());
        scene.set_material(mesh, &Material::default()).unwrap();
        scene.add_light(Light {
            name: "Key".into(),
            position: Point3::new(5.0, -5.0, 5.0),
            energy: 1000.0,
        });
        let cam = scene.add_camera(Camera::tracking("Cam", Point3::new(6.0, -6.0, 6.0), Point3::origin()));
        let path = dir.path().join("view.png");
        scene.render(cam, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (32, 24));
        // the cube covers the image center
        assert_ne!(img.get_pixel(16, 12).0, [0, 0, 0]);
    }
}
