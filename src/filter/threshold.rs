use ndarray::Array3;

use crate::volume::BinaryMask;

/// Binarizes a scalar field with a strict `value > threshold` test.
pub struct Binarize {
    threshold: f32,
}

impl Binarize {
    /// Creates a new `Binarize` operation.
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Executes the thresholding.
    #[must_use]
    pub fn execute(&self, field: &Array3<f32>) -> BinaryMask {
        let t = self.threshold;
        BinaryMask::new(field.mapv(|v| v > t))
    }
}
