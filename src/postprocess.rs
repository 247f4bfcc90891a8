//! Turns an extracted surface into a finished scene object.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::mesh::SurfaceMesh;
use crate::scene::{Material, ObjectId, SceneGraph};

/// One Laplacian smoothing modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothPass {
    /// Per-iteration Laplacian factor.
    pub factor: f64,
    /// Number of iterations.
    pub iterations: usize,
}

/// Settings for [`PostProcess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessParams {
    /// Name given to the scene object.
    pub object_name: String,
    /// Shell thickness added by the solidify step.
    pub solidify_thickness: f64,
    /// Uniform absolute scale.
    pub scale: f64,
    /// Smoothing modifiers, stacked in order before solidify.
    pub smooth_passes: Vec<SmoothPass>,
}

impl Default for PostProcessParams {
    fn default() -> Self {
        Self {
            object_name: "T1_Skull".into(),
            solidify_thickness: 0.8,
            scale: 1.0,
            smooth_passes: vec![
                SmoothPass {
                    factor: 0.5,
                    iterations: 3,
                },
                SmoothPass {
                    factor: 0.7,
                    iterations: 5,
                },
            ],
        }
    }
}

/// Materializes a mesh in a scene and dresses it for display.
///
/// Operator order is fixed: create, material, smooth shading, recenter,
/// smooth modifiers, solidify modifier, scale. The material is the default
/// bone-white diffuse.
pub struct PostProcess {
    params: PostProcessParams,
}

impl PostProcess {
    /// Creates a new `PostProcess`.
    #[must_use]
    pub fn new(params: PostProcessParams) -> Self {
        Self { params }
    }

    /// Executes the post-processing against `scene`.
    ///
    /// # Errors
    ///
    /// Propagates any error reported by the scene.
    pub fn execute(&self, mesh: SurfaceMesh, scene: &mut impl SceneGraph) -> Result<ObjectId> {
        let p = &self.params;
        let id = scene.create_mesh(&p.object_name, mesh);
        scene.set_material(id, &Material::default())?;
        scene.set_smooth_shading(id, true)?;
        scene.recenter_origin(id)?;
        for pass in &p.smooth_passes {
            scene.add_smooth_modifier(id, pass.factor, pass.iterations)?;
        }
        scene.add_solidify_modifier(id, p.solidify_thickness)?;
        scene.set_scale(id, p.scale, p.scale, p.scale)?;
        info!(
            object = %p.object_name,
            smooth_passes = p.smooth_passes.len(),
            thickness = p.solidify_thickness,
            scale = p.scale,
            "post-processing complete"
        );
        Ok(id)
    }
}
