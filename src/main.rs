//! Cranium CLI - reconstruct and render a head scan from a TIFF stack
//!
//! ```text
//! cranium t1-head.tif --output save/ --downsample 2 --threshold 0.85
//! cranium t1-head.tif --config cranium.toml --stl skull.stl
//! ```
//!
//! Settings resolve as defaults, then `--config`, then `CRANIUM_*`
//! environment variables, then flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cranium::config::PipelineConfig;
use cranium::pipeline::Pipeline;
use cranium::scene::SceneStore;

#[derive(Parser, Debug)]
#[command(name = "cranium")]
#[command(about = "Extract and render a skull surface from an MRI TIFF stack", long_about = None)]
struct Cli {
    /// Multi-page grayscale TIFF
    input: PathBuf,

    /// Directory receiving one PNG per camera view
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stride applied to every volume axis
    #[arg(long)]
    downsample: Option<usize>,

    /// Cutoff on the smoothed, inverted volume, in [0, 1]
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Gaussian smoothing sigma in voxels
    #[arg(long)]
    sigma: Option<f32>,

    /// Ball radius for morphological closing
    #[arg(long)]
    closing_radius: Option<usize>,

    /// Uniform scale of the final object
    #[arg(long)]
    scale: Option<f64>,

    /// Also write the extracted surface as binary STL
    #[arg(long)]
    stl: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut PipelineConfig) {
        let extraction = &mut config.extraction;
        if let Some(v) = self.downsample {
            extraction.downsample = v;
        }
        if let Some(v) = self.threshold {
            extraction.threshold = v;
        }
        if let Some(v) = self.sigma {
            extraction.smoothing_sigma = v;
        }
        if let Some(v) = self.closing_radius {
            extraction.closing_radius = v;
        }
        if let Some(v) = self.scale {
            config.postprocess.scale = v;
        }
        if let Some(dir) = &self.output {
            config.export.output_dir.clone_from(dir);
        }
        if let Some(path) = &self.stl {
            config.export.stl = Some(path.clone());
        }
    }
}

fn main() -> Result<()> {
    // Default: WARN for everything, INFO for cranium.
    // Override with RUST_LOG env var (e.g. RUST_LOG=cranium=debug).
    let env_filter = EnvFilter::from_default_env()
        .add_directive(LevelFilter::WARN.into())
        .add_directive("cranium=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let mut config =
        PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let mut scene = SceneStore::with_size(config.render.width, config.render.height)?;
    let report = Pipeline::new(config)
        .run(&cli.input, &mut scene)
        .with_context(|| format!("Failed to reconstruct {}", cli.input.display()))?;

    if let Some(reason) = &report.fallback {
        println!("Marching cubes failed ({reason}); rendered placeholder cube");
    } else {
        println!(
            "Surface: {} vertices, {} triangles",
            report.vertex_count, report.face_count
        );
    }
    for path in &report.images {
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &report.stl {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
