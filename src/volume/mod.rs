mod load;

pub use load::LoadVolume;

use ndarray::{s, Array3};

use crate::error::VolumeError;

/// Summary of how a volume was produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeStats {
    /// Shape of the stack as read from its source, before downsampling.
    pub source_shape: [usize; 3],
    /// Minimum raw intensity before normalization.
    pub raw_min: f32,
    /// Maximum raw intensity before normalization.
    pub raw_max: f32,
    /// `true` when the raw input was constant and the volume was zeroed.
    pub degenerate: bool,
}

/// A dense 3D scalar field with intensities normalized to `[0, 1]`.
///
/// Axes are `(depth, height, width)`; the first axis is the page index of the
/// source stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume {
    data: Array3<f32>,
    stats: VolumeStats,
}

impl ScalarVolume {
    /// Normalizes raw intensities into `[0, 1]` via `(v - min) / (max - min)`.
    ///
    /// A constant-valued input yields an all-zero volume of the same shape.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NonFinite`] if any intensity is NaN or infinite.
    pub fn normalize(raw: Array3<f32>) -> Result<Self, VolumeError> {
        let (min, max) = finite_range(&raw)?;
        let source_shape = shape_of(&raw);

        let degenerate = max <= min;
        let data = if degenerate {
            tracing::warn!(value = min, "constant-intensity volume, substituting zeros");
            Array3::zeros(raw.raw_dim())
        } else {
            let span = max - min;
            raw.mapv_into(|v| ((v - min) / span).clamp(0.0, 1.0))
        };

        Ok(Self {
            data,
            stats: VolumeStats {
                source_shape,
                raw_min: min,
                raw_max: max,
                degenerate,
            },
        })
    }

    /// Wraps intensities that are already normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is non-finite or outside `[0, 1]`.
    pub fn from_normalized(data: Array3<f32>) -> Result<Self, VolumeError> {
        let (min, max) = finite_range(&data)?;
        if let Some(&bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(VolumeError::OutOfRange(bad));
        }
        Ok(Self {
            stats: VolumeStats {
                source_shape: shape_of(&data),
                raw_min: min,
                raw_max: max,
                degenerate: false,
            },
            data,
        })
    }

    /// Returns a new volume keeping every `stride`-th sample along each axis,
    /// starting at index 0.
    ///
    /// No filtering is applied, so thin structures can alias away at large
    /// strides. Each output axis has length `ceil(len / stride)`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidDownsample`] if `stride` is zero.
    pub fn downsample(&self, stride: usize) -> Result<Self, VolumeError> {
        let step = isize::try_from(stride)
            .ok()
            .filter(|&s| s > 0)
            .ok_or(VolumeError::InvalidDownsample(stride))?;
        if step == 1 {
            return Ok(self.clone());
        }
        Ok(Self {
            data: self.data.slice(s![..;step, ..;step, ..;step]).to_owned(),
            stats: self.stats,
        })
    }

    /// Shape as `[depth, height, width]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        shape_of(&self.data)
    }

    /// Borrows the normalized intensities.
    #[must_use]
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Provenance of this volume.
    #[must_use]
    pub fn stats(&self) -> &VolumeStats {
        &self.stats
    }

    /// Computes `1 - v` elementwise.
    #[must_use]
    pub fn inverted(&self) -> Array3<f32> {
        self.data.mapv(|v| 1.0 - v)
    }
}

/// A dense 3D boolean mask sharing the shape of the volume it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    data: Array3<bool>,
}

impl BinaryMask {
    /// Wraps a boolean array.
    #[must_use]
    pub fn new(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// Shape as `[depth, height, width]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        let (d, h, w) = self.data.dim();
        [d, h, w]
    }

    /// Borrows the underlying array.
    #[must_use]
    pub fn data(&self) -> &Array3<bool> {
        &self.data
    }

    /// Number of set voxels.
    #[must_use]
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Converts the mask to a `0.0` / `1.0` scalar field.
    #[must_use]
    pub fn to_field(&self) -> Array3<f32> {
        self.data.mapv(|b| if b { 1.0 } else { 0.0 })
    }
}

fn shape_of<T>(data: &Array3<T>) -> [usize; 3] {
    let (d, h, w) = data.dim();
    [d, h, w]
}

/// Global `(min, max)` of a field, rejecting non-finite values.
fn finite_range(data: &Array3<f32>) -> Result<(f32, f32), VolumeError> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in data {
        if !v.is_finite() {
            return Err(VolumeError::NonFinite);
        }
        min = min.min(v);
        max = max.max(v);
    }
    if data.is_empty() {
        return Ok((0.0, 0.0));
    }
    Ok((min, max))
}
