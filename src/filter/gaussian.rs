use ndarray::{Array3, ArrayView1, ArrayViewMut1, Axis, Zip};

/// Number of standard deviations covered by the kernel on each side.
const TRUNCATE: f64 = 4.0;

/// Sigmas at or below this are treated as "no smoothing".
const MIN_SIGMA: f64 = 1e-15;

/// Isotropic Gaussian smoothing of a 3D field.
///
/// Applied as three separable 1D convolutions. Samples beyond the border are
/// mirrored about the edge (`d c b a | a b c d`).
pub struct GaussianFilter {
    sigma: f64,
}

impl GaussianFilter {
    /// Creates a new `GaussianFilter` with the given standard deviation in voxels.
    #[must_use]
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Executes the filter, returning a new field of the same shape.
    #[must_use]
    pub fn execute(&self, field: &Array3<f32>) -> Array3<f32> {
        if self.sigma.is_nan() || self.sigma <= MIN_SIGMA {
            return field.clone();
        }
        let longest = field.shape().iter().copied().max().unwrap_or(0);
        let kernel = kernel(self.sigma, 2 * longest);
        let mut current = field.clone();
        for axis in 0..3 {
            current = convolve_axis(&current, Axis(axis), &kernel);
        }
        current
    }
}

/// Normalized half-kernel `w[0..=radius]`; the full kernel is symmetric.
///
/// The radius never exceeds `max_radius`. Mirroring repeats every `2n`
/// samples, so a lane of length `n` gains nothing from a radius beyond `2n`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn kernel(sigma: f64, max_radius: usize) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5).min(max_radius as f64) as usize;
    let mut weights: Vec<f64> = (0..=radius)
        .map(|k| {
            let x = k as f64;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f64>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

fn convolve_axis(field: &Array3<f32>, axis: Axis, kernel: &[f64]) -> Array3<f32> {
    let mut out = Array3::zeros(field.raw_dim());
    Zip::from(out.lanes_mut(axis))
        .and(field.lanes(axis))
        .for_each(|dst, src| convolve_lane(src, dst, kernel));
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn convolve_lane(src: ArrayView1<f32>, mut dst: ArrayViewMut1<f32>, kernel: &[f64]) {
    let n = src.len() as isize;
    for i in 0..n {
        let mut acc = kernel[0] * f64::from(src[i as usize]);
        for (k, &w) in kernel.iter().enumerate().skip(1) {
            let k = k as isize;
            acc += w * (f64::from(src[reflect(i - k, n)]) + f64::from(src[reflect(i + k, n)]));
        }
        dst[i as usize] = acc as f32;
    }
}

/// Maps an out-of-range index back into `[0, n)` by half-sample mirroring.
#[allow(clippy::cast_sign_loss)]
fn reflect(i: isize, n: isize) -> usize {
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}
