//! Isosurface extraction from a normalized scan.
//!
//! The extractor inverts the volume so that dark boundaries become bright
//! ridges, smooths it, thresholds it into a mask, closes small gaps and runs
//! marching cubes on the result. A mask with no isosurface degrades to a
//! placeholder cube instead of an error; see [`Extraction`].

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};
use crate::filter::{Binarize, BinaryClosing, GaussianFilter};
use crate::mesh::{MarchingCubes, SurfaceMesh};
use crate::volume::{BinaryMask, ScalarVolume};

/// Iso-level applied to the 0/1 mask.
pub const MASK_LEVEL: f32 = 0.5;

/// Output coordinate negated after extraction so the surface faces the
/// default front view.
pub const ORIENTATION_FLIP_AXIS: usize = 2;

/// Tuning knobs for loading and extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParameters {
    /// Stride applied to each volume axis (1 = full resolution).
    pub downsample: usize,
    /// Cutoff on the smoothed, inverted volume.
    pub threshold: f32,
    /// Gaussian standard deviation in voxels.
    pub smoothing_sigma: f32,
    /// Radius of the ball used for morphological closing.
    pub closing_radius: usize,
}

impl Default for ExtractionParameters {
    fn default() -> Self {
        Self {
            downsample: 4,
            threshold: 0.65,
            smoothing_sigma: 0.7,
            closing_radius: 1,
        }
    }
}

impl ExtractionParameters {
    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidParameter`] for the first bad field.
    pub fn validate(&self) -> std::result::Result<(), ExtractionError> {
        if self.downsample == 0 {
            return Err(ExtractionError::InvalidParameter {
                parameter: "downsample",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ExtractionError::InvalidParameter {
                parameter: "threshold",
                value: f64::from(self.threshold),
                reason: "must lie in [0, 1]",
            });
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return Err(ExtractionError::InvalidParameter {
                parameter: "smoothing_sigma",
                value: f64::from(self.smoothing_sigma),
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Result of an extraction: either a real surface or the placeholder that
/// stands in for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Marching cubes produced a surface.
    Surface(SurfaceMesh),
    /// No isosurface exists for the mask; `mesh` is
    /// [`SurfaceMesh::placeholder_cube`] and carries no information about the
    /// scan.
    Fallback {
        mesh: SurfaceMesh,
        reason: ExtractionError,
    },
}

impl Extraction {
    /// Returns `true` if this is the placeholder fallback.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Borrows the mesh, real or placeholder.
    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        match self {
            Self::Surface(mesh) | Self::Fallback { mesh, .. } => mesh,
        }
    }

    /// Takes the mesh, real or placeholder.
    #[must_use]
    pub fn into_mesh(self) -> SurfaceMesh {
        match self {
            Self::Surface(mesh) | Self::Fallback { mesh, .. } => mesh,
        }
    }
}

/// Extracts a boundary surface from a normalized volume.
pub struct ExtractSurface {
    threshold: f32,
    smoothing_sigma: f32,
    closing_radius: usize,
}

impl ExtractSurface {
    /// Creates a new `ExtractSurface` with default smoothing (sigma 0.7) and
    /// closing (radius 1).
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        let defaults = ExtractionParameters::default();
        Self {
            threshold,
            smoothing_sigma: defaults.smoothing_sigma,
            closing_radius: defaults.closing_radius,
        }
    }

    /// Creates an `ExtractSurface` from a parameter set.
    #[must_use]
    pub fn from_params(params: &ExtractionParameters) -> Self {
        Self {
            threshold: params.threshold,
            smoothing_sigma: params.smoothing_sigma,
            closing_radius: params.closing_radius,
        }
    }

    /// Sets the Gaussian standard deviation.
    #[must_use]
    pub fn with_smoothing(mut self, sigma: f32) -> Self {
        self.smoothing_sigma = sigma;
        self
    }

    /// Sets the closing radius.
    #[must_use]
    pub fn with_closing_radius(mut self, radius: usize) -> Self {
        self.closing_radius = radius;
        self
    }

    /// Runs inversion, smoothing, thresholding and closing, returning the mask
    /// that marching cubes would see.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold or sigma is out of range.
    pub fn mask(&self, volume: &ScalarVolume) -> Result<BinaryMask> {
        self.params().validate()?;

        let inverted = volume.inverted();
        let smoothed = GaussianFilter::new(f64::from(self.smoothing_sigma)).execute(&inverted);
        let binary = Binarize::new(self.threshold).execute(&smoothed);
        let closed = BinaryClosing::new(self.closing_radius).execute(&binary);
        tracing::debug!(
            set = closed.count_true(),
            total = closed.data().len(),
            "mask prepared"
        );
        Ok(closed)
    }

    /// Executes the extraction.
    ///
    /// Marching-cubes failures are absorbed into [`Extraction::Fallback`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the threshold or sigma is out of range.
    pub fn execute(&self, volume: &ScalarVolume) -> Result<Extraction> {
        tracing::info!(
            threshold = self.threshold,
            sigma = self.smoothing_sigma,
            closing_radius = self.closing_radius,
            "extracting surface"
        );
        let mask = self.mask(volume)?;

        match MarchingCubes::new(MASK_LEVEL).execute(&mask.to_field()) {
            Ok(mut mesh) => {
                mesh.flip_axis(ORIENTATION_FLIP_AXIS);
                tracing::info!(
                    vertices = mesh.vertices.len(),
                    faces = mesh.faces.len(),
                    "marching cubes succeeded"
                );
                Ok(Extraction::Surface(mesh))
            }
            Err(reason) => {
                tracing::warn!(%reason, "marching cubes failed, using placeholder cube");
                Ok(Extraction::Fallback {
                    mesh: SurfaceMesh::placeholder_cube(),
                    reason,
                })
            }
        }
    }

    fn params(&self) -> ExtractionParameters {
        ExtractionParameters {
            downsample: 1,
            threshold: self.threshold,
            smoothing_sigma: self.smoothing_sigma,
            closing_radius: self.closing_radius,
        }
    }
}
