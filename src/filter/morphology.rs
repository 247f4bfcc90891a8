use ndarray::Array3;

use crate::volume::BinaryMask;

/// Offsets of a spherical structuring element: all `(dz, dy, dx)` with
/// `dz² + dy² + dx² <= radius²`.
///
/// Radius 0 yields the single center voxel.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn ball(radius: usize) -> Vec<[isize; 3]> {
    let r = radius as isize;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dz in -r..=r {
        for dy in -r..=r {
            for dx in -r..=r {
                if dz * dz + dy * dy + dx * dx <= r2 {
                    offsets.push([dz, dy, dx]);
                }
            }
        }
    }
    offsets
}

/// Binary dilation: a voxel is set if any neighbor under the element is set.
///
/// Voxels outside the mask count as unset.
pub struct BinaryDilation<'a> {
    element: &'a [[isize; 3]],
}

impl<'a> BinaryDilation<'a> {
    /// Creates a new `BinaryDilation` with the given structuring element.
    #[must_use]
    pub fn new(element: &'a [[isize; 3]]) -> Self {
        Self { element }
    }

    /// Executes the dilation.
    #[must_use]
    pub fn execute(&self, mask: &BinaryMask) -> BinaryMask {
        BinaryMask::new(sweep(mask.data(), self.element, false, |acc, v| acc || v))
    }
}

/// Binary erosion: a voxel stays set only if every neighbor under the element
/// is set.
///
/// Voxels outside the mask count as set, so the border is never eroded.
pub struct BinaryErosion<'a> {
    element: &'a [[isize; 3]],
}

impl<'a> BinaryErosion<'a> {
    /// Creates a new `BinaryErosion` with the given structuring element.
    #[must_use]
    pub fn new(element: &'a [[isize; 3]]) -> Self {
        Self { element }
    }

    /// Executes the erosion.
    #[must_use]
    pub fn execute(&self, mask: &BinaryMask) -> BinaryMask {
        BinaryMask::new(sweep(mask.data(), self.element, true, |acc, v| acc && v))
    }
}

/// Morphological closing (dilation followed by erosion) with a ball element.
///
/// Fills holes and gaps narrower than the element while leaving the outline of
/// larger regions in place.
pub struct BinaryClosing {
    radius: usize,
}

impl BinaryClosing {
    /// Creates a new `BinaryClosing` with a ball of the given radius.
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Executes the closing.
    #[must_use]
    pub fn execute(&self, mask: &BinaryMask) -> BinaryMask {
        if self.radius == 0 {
            return mask.clone();
        }
        let element = ball(self.radius);
        let dilated = BinaryDilation::new(&element).execute(mask);
        BinaryErosion::new(&element).execute(&dilated)
    }
}

/// Folds `combine` over the neighborhood of every voxel, starting from the
/// identity `border` (which also stands in for out-of-range neighbors).
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn sweep(
    data: &Array3<bool>,
    element: &[[isize; 3]],
    border: bool,
    combine: impl Fn(bool, bool) -> bool,
) -> Array3<bool> {
    let (d, h, w) = data.dim();
    let dims = [d as isize, h as isize, w as isize];
    Array3::from_shape_fn((d, h, w), |(z, y, x)| {
        let here = [z as isize, y as isize, x as isize];
        element.iter().fold(border, |acc, off| {
            let p = [here[0] + off[0], here[1] + off[1], here[2] + off[2]];
            let inside = (0..3).all(|a| p[a] >= 0 && p[a] < dims[a]);
            let v = if inside {
                data[[p[0] as usize, p[1] as usize, p[2] as usize]]
            } else {
                border
            };
            combine(acc, v)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(shape: (usize, usize, usize), set: &[[usize; 3]]) -> BinaryMask {
        let mut data = Array3::from_elem(shape, false);
        for &idx in set {
            data[idx] = true;
        }
        BinaryMask::new(data)
    }

    #[test]
    fn ball_sizes() {
        assert_eq!(ball(0), vec![[0, 0, 0]]);
        // 6-connected cross plus center
        assert_eq!(ball(1).len(), 7);
        assert_eq!(ball(2).len(), 33);
    }

    #[test]
    fn dilation_grows_single_voxel_to_cross() {
        let element = ball(1);
        let mask = mask_with((5, 5, 5), &[[2, 2, 2]]);
        let grown = BinaryDilation::new(&element).execute(&mask);
        assert_eq!(grown.count_true(), 7);
        assert!(grown.data()[[1, 2, 2]]);
        assert!(!grown.data()[[1, 1, 2]]);
    }

    #[test]
    fn erosion_keeps_border_voxels() {
        let element = ball(1);
        let mask = BinaryMask::new(Array3::from_elem((3, 3, 3), true));
        let eroded = BinaryErosion::new(&element).execute(&mask);
        assert_eq!(eroded.count_true(), 27);
    }

    #[test]
    fn closing_fills_single_voxel_hole() {
        let mut data = Array3::from_elem((5, 5, 5), true);
        data[[2, 2, 2]] = false;
        let closed = BinaryClosing::new(1).execute(&BinaryMask::new(data));
        assert_eq!(closed.count_true(), 125);
    }

    #[test]
    fn closing_bridges_one_voxel_gap() {
        let mask = mask_with((1, 1, 7), &[[0, 0, 2], [0, 0, 4]]);
        let closed = BinaryClosing::new(1).execute(&mask);
        assert!(closed.data()[[0, 0, 3]]);
        assert!(!closed.data()[[0, 0, 1]]);
        assert!(!closed.data()[[0, 0, 5]]);
        assert_eq!(closed.count_true(), 3);
    }

    #[test]
    fn closing_radius_zero_is_identity() {
        let mask = mask_with((3, 3, 3), &[[0, 1, 2]]);
        assert_eq!(BinaryClosing::new(0).execute(&mask), mask);
    }

    #[test]
    fn closing_never_removes_voxels() {
        let mask = mask_with((6, 6, 6), &[[1, 1, 1], [4, 2, 3], [5, 5, 5], [0, 3, 2]]);
        let closed = BinaryClosing::new(1).execute(&mask);
        for (idx, &v) in mask.data().indexed_iter() {
            if v {
                assert!(closed.data()[idx]);
            }
        }
    }
}
