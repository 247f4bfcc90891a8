//! Pipeline configuration.
//!
//! Sources are merged with the following priority (lowest to highest):
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables (`CRANIUM_SECTION__KEY`)
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extraction::ExtractionParameters;
use crate::postprocess::PostProcessParams;
use crate::render::RenderSettings;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "CRANIUM_";

/// Complete configuration of a reconstruction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Loading and surface extraction
    #[serde(default)]
    pub extraction: ExtractionParameters,
    /// Scene object dressing
    #[serde(default)]
    pub postprocess: PostProcessParams,
    /// Image rendering
    #[serde(default)]
    pub render: RenderSettings,
    /// Output locations
    #[serde(default)]
    pub export: ExportConfig,
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving one image per camera view.
    pub output_dir: PathBuf,
    /// Optional binary STL of the extracted surface.
    pub stl: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("save"),
            stl: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from defaults, `file` (if given) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if `file` does not exist, or
    /// [`ConfigError::Load`] if a source cannot be parsed.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = file {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        // CRANIUM_EXTRACTION__THRESHOLD=0.8 -> extraction.threshold = 0.8
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.extraction.downsample, 4);
        assert!((config.extraction.threshold - 0.65).abs() < f32::EPSILON);
        assert_eq!(config.extraction.closing_radius, 1);
        assert_eq!(config.postprocess.smooth_passes.len(), 2);
        assert!((config.render.camera_distance_scale - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.export.stl, None);
    }

    #[test]
    fn serializes_every_section() {
        let text = toml::to_string(&PipelineConfig::default()).unwrap();
        for key in ["[extraction]", "[postprocess]", "[render]", "[export]", "threshold", "solidify_thickness"] {
            assert!(text.contains(key), "missing {key}");
        }
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cranium.toml");
        std::fs::write(
            &path,
            "[extraction]\nthreshold = 0.85\ndownsample = 2\n\n[postprocess]\nscale = 24.0\n\n[export]\nstl = \"skull.stl\"\n",
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert!((config.extraction.threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.extraction.downsample, 2);
        // untouched keys keep their defaults
        assert!((config.extraction.smoothing_sigma - 0.7).abs() < f32::EPSILON);
        assert!((config.postprocess.scale - 24.0).abs() < f64::EPSILON);
        assert_eq!(config.export.stl, Some(PathBuf::from("skull.stl")));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = PipelineConfig::load(Some(Path::new("/no/such/cranium.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[extraction]\nthreshold = \"high\"\n").unwrap();
        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
