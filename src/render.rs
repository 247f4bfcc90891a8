//! Lighting, camera rig and multi-view rendering.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RenderError, Result};
use crate::math::{Point3, Vector3};
use crate::scene::{Camera, Light, SceneGraph};

/// World background color.
const BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Area light positions.
const LIGHT_POSITIONS: [[f64; 3]; 3] = [[50.0, -50.0, 50.0], [-50.0, -50.0, 30.0], [0.0, 50.0, 50.0]];

/// Power of each area light.
const LIGHT_ENERGY: f32 = 10_000.0;

/// Settings for [`RenderDriver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Multiplier applied to each view's base offset from the target.
    pub camera_distance_scale: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            camera_distance_scale: 30.0,
        }
    }
}

/// One of the fixed anatomical camera views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraView {
    Sagittal,
    Coronal,
    Axial,
    Perspective,
}

impl CameraView {
    /// All views in render order. The last one becomes the active camera.
    pub const ALL: [Self; 4] = [Self::Sagittal, Self::Coronal, Self::Axial, Self::Perspective];

    /// View name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sagittal => "Sagittal",
            Self::Coronal => "Coronal",
            Self::Axial => "Axial",
            Self::Perspective => "Perspective",
        }
    }

    /// Camera offset from the target before distance scaling.
    #[must_use]
    pub fn base_offset(self) -> Vector3 {
        match self {
            Self::Sagittal => Vector3::new(7.0, 0.0, 0.0),
            Self::Coronal => Vector3::new(0.0, -7.0, 0.0),
            Self::Axial => Vector3::new(0.0, 0.0, 7.0),
            Self::Perspective => Vector3::new(5.0, -5.0, 5.0),
        }
    }

    /// Camera object name, e.g. `Axial_Cam`.
    #[must_use]
    pub fn camera_name(self) -> String {
        format!("{}_Cam", self.name())
    }

    /// Output file name, e.g. `Axial_Cam.png`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.png", self.camera_name())
    }
}

/// Sets up lights and cameras around a target and renders every view.
pub struct RenderDriver {
    output_dir: PathBuf,
    settings: RenderSettings,
}

impl RenderDriver {
    /// Creates a new `RenderDriver` writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, settings: RenderSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            settings,
        }
    }

    /// Executes the render, returning the written image paths in
    /// [`CameraView::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::OutputDir`] if the directory cannot be created,
    /// or any error the scene reports while rendering.
    pub fn execute(&self, scene: &mut impl SceneGraph, target: &Point3) -> Result<Vec<PathBuf>> {
        scene.set_background(BACKGROUND);
        for (i, position) in LIGHT_POSITIONS.iter().enumerate() {
            scene.add_light(Light {
                name: format!("MedicalLight_{i}"),
                position: Point3::from(*position),
                energy: LIGHT_ENERGY,
            });
        }

        let cameras: Vec<_> = CameraView::ALL
            .iter()
            .map(|&view| {
                let position = target + view.base_offset() * self.settings.camera_distance_scale;
                let id = scene.add_camera(Camera::tracking(view.camera_name(), position, *target));
                (view, id)
            })
            .collect();
        if let Some(&(_, active)) = cameras.last() {
            scene.set_active_camera(active)?;
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut written = Vec::with_capacity(cameras.len());
        for (view, id) in cameras {
            let path = self.output_dir.join(view.file_name());
            scene.set_active_camera(id)?;
            scene.render(id, &path)?;
            info!(view = view.name(), path = %path.display(), "rendered camera view");
            written.push(path);
        }
        Ok(written)
    }
}
