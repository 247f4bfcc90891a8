//! End-to-end reconstruction: load, extract, dress, render.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{ExtractionError, Result};
use crate::extraction::{Extraction, ExtractSurface};
use crate::math::Point3;
use crate::mesh::stl::write_binary_stl;
use crate::postprocess::PostProcess;
use crate::render::RenderDriver;
use crate::scene::{ObjectId, SceneGraph};
use crate::volume::{LoadVolume, VolumeStats};

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// How the volume was read and normalized.
    pub stats: VolumeStats,
    /// Volume shape after downsampling.
    pub volume_shape: [usize; 3],
    /// Why the placeholder cube was used, if it was.
    pub fallback: Option<ExtractionError>,
    /// Vertices in the extracted surface.
    pub vertex_count: usize,
    /// Triangles in the extracted surface.
    pub face_count: usize,
    /// Scene handle of the skull object.
    pub object: ObjectId,
    /// Rendered images, one per camera view.
    pub images: Vec<PathBuf>,
    /// Exported STL, if requested.
    pub stl: Option<PathBuf>,
}

impl PipelineReport {
    /// Returns `true` if extraction fell back to the placeholder cube.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Runs the full reconstruction for one scan.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a new `Pipeline`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Executes every stage against `input`, building objects in `scene`.
    ///
    /// A placeholder surface is post-processed and rendered exactly like an
    /// extracted one.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, the scan cannot be
    /// loaded, or an output cannot be written. Extraction failures do not
    /// error; they are reported through [`PipelineReport::fallback`].
    pub fn run(&self, input: &Path, scene: &mut impl SceneGraph) -> Result<PipelineReport> {
        let params = &self.config.extraction;
        params.validate()?;

        info!(
            input = %input.display(),
            output = %self.config.export.output_dir.display(),
            downsample = params.downsample,
            threshold = params.threshold,
            scale = self.config.postprocess.scale,
            "starting reconstruction"
        );

        let volume = LoadVolume::new(input, params.downsample).execute()?;
        let extraction = ExtractSurface::from_params(params).execute(&volume)?;

        let fallback = match &extraction {
            Extraction::Surface(_) => None,
            Extraction::Fallback { reason, .. } => {
                debug!(%reason, "continuing with placeholder surface");
                Some(reason.clone())
            }
        };
        let mesh = extraction.into_mesh();
        let (vertex_count, face_count) = (mesh.vertices.len(), mesh.faces.len());
        debug!(vertex_count, face_count, "surface ready");

        let stl = match &self.config.export.stl {
            Some(path) => {
                write_binary_stl(path, &mesh, &self.config.postprocess.object_name)?;
                info!(path = %path.display(), "exported surface");
                Some(path.clone())
            }
            None => None,
        };

        let object = PostProcess::new(self.config.postprocess.clone()).execute(mesh, scene)?;
        let images = RenderDriver::new(&self.config.export.output_dir, self.config.render.clone())
            .execute(scene, &Point3::origin())?;

        info!(images = images.len(), fallback = fallback.is_some(), "reconstruction complete");

        Ok(PipelineReport {
            stats: *volume.stats(),
            volume_shape: volume.shape(),
            fallback,
            vertex_count,
            face_count,
            object,
            images,
            stl,
        })
    }
}
