use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the Cranium reconstruction pipeline.
#[derive(Debug, Error)]
pub enum CraniumError {
    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading a volumetric scan.
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("volume file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("downsample stride must be a positive integer, got {0}")]
    InvalidDownsample(usize),

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image stack {}", path.display())]
    Decode {
        path: PathBuf,
        source: tiff::TiffError,
    },

    #[error("image stack {} contains no pages", .0.display())]
    EmptyStack(PathBuf),

    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixelType(String),

    #[error("page {page} is {found:?} (width, height), expected {expected:?}")]
    PageShape {
        page: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("volume contains non-finite intensities")]
    NonFinite,

    #[error("normalized volume value {0} lies outside [0, 1]")]
    OutOfRange(f32),

    #[error("invalid volume shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Errors raised by surface extraction.
///
/// Only [`ExtractionError::InvalidParameter`] ever reaches a caller of
/// [`crate::extraction::ExtractSurface`]; the rest are absorbed into the
/// placeholder fallback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("parameter {parameter} = {value} is invalid: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("volume of shape {shape:?} is too small for marching cubes")]
    VolumeTooSmall { shape: [usize; 3] },

    #[error("surface level {level} must lie within the data range [{min}, {max}]")]
    LevelOutOfRange { level: f32, min: f32, max: f32 },

    #[error("marching cubes produced no triangles")]
    EmptySurface,
}

/// Errors related to the scene collaborator.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene object not found: {0}")]
    ObjectNotFound(String),

    #[error("scene object {name} is not a {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
    },
}

/// Errors raised while writing output artifacts.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write image {}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("cannot write mesh {}", path.display())]
    Mesh {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("render size must be non-zero, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Convenience type alias for results using [`CraniumError`].
pub type Result<T> = std::result::Result<T, CraniumError>;
