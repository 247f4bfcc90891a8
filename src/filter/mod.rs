//! Volume filters applied between normalization and isosurface extraction.

mod gaussian;
mod morphology;
mod threshold;

pub use gaussian::GaussianFilter;
pub use morphology::{ball, BinaryClosing, BinaryDilation, BinaryErosion};
pub use threshold::Binarize;
