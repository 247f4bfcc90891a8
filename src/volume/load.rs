use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::error::{Result, VolumeError};

use super::ScalarVolume;

/// Loads a multi-page grayscale TIFF stack into a normalized [`ScalarVolume`].
///
/// Pages are stacked in file order along the first axis. After global
/// min/max normalization the volume is optionally reduced by strided
/// selection (see [`ScalarVolume::downsample`]).
pub struct LoadVolume {
    path: PathBuf,
    downsample: usize,
}

impl LoadVolume {
    /// Creates a new `LoadVolume` operation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, downsample: usize) -> Self {
        Self {
            path: path.into(),
            downsample,
        }
    }

    /// Executes the load.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if the file does not exist, and a
    /// read or decode error if the stack cannot be parsed.
    pub fn execute(&self) -> Result<ScalarVolume> {
        if self.downsample == 0 {
            return Err(VolumeError::InvalidDownsample(self.downsample).into());
        }
        if !self.path.exists() {
            return Err(VolumeError::NotFound(self.path.clone()).into());
        }

        let raw = read_stack(&self.path)?;
        let volume = ScalarVolume::normalize(raw)?;
        let stats = *volume.stats();
        let volume = volume.downsample(self.downsample)?;

        tracing::info!(
            path = %self.path.display(),
            shape = ?volume.shape(),
            raw_min = stats.raw_min,
            raw_max = stats.raw_max,
            "loaded volume"
        );
        Ok(volume)
    }
}

/// Reads every page of the stack as `f32` samples.
fn read_stack(path: &Path) -> std::result::Result<Array3<f32>, VolumeError> {
    let decode_err = |source| VolumeError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| VolumeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;

    let (width, height) = decoder.dimensions().map_err(decode_err)?;
    let mut samples: Vec<f32> = Vec::new();
    let mut depth = 0usize;

    loop {
        let dims = decoder.dimensions().map_err(decode_err)?;
        if dims != (width, height) {
            return Err(VolumeError::PageShape {
                page: depth,
                expected: (width, height),
                found: dims,
            });
        }
        match decoder.colortype().map_err(decode_err)? {
            ColorType::Gray(_) => {}
            other => {
                return Err(VolumeError::UnsupportedPixelType(format!(
                    "page {depth} has color type {other:?}, expected grayscale"
                )))
            }
        }

        let page = decoder.read_image().map_err(decode_err)?;
        append_samples(page, &mut samples)?;
        depth += 1;
        tracing::debug!(page = depth, "decoded page");

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(decode_err)?;
    }

    if depth == 0 {
        return Err(VolumeError::EmptyStack(path.to_path_buf()));
    }

    Ok(Array3::from_shape_vec(
        (depth, height as usize, width as usize),
        samples,
    )?)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn append_samples(page: DecodingResult, out: &mut Vec<f32>) -> std::result::Result<(), VolumeError> {
    match page {
        DecodingResult::U8(v) => out.extend(v.into_iter().map(f32::from)),
        DecodingResult::U16(v) => out.extend(v.into_iter().map(f32::from)),
        DecodingResult::U32(v) => out.extend(v.into_iter().map(|s| s as f32)),
        DecodingResult::U64(v) => out.extend(v.into_iter().map(|s| s as f32)),
        DecodingResult::I8(v) => out.extend(v.into_iter().map(f32::from)),
        DecodingResult::I16(v) => out.extend(v.into_iter().map(f32::from)),
        DecodingResult::I32(v) => out.extend(v.into_iter().map(|s| s as f32)),
        DecodingResult::I64(v) => out.extend(v.into_iter().map(|s| s as f32)),
        DecodingResult::F32(v) => out.extend(v),
        DecodingResult::F64(v) => out.extend(v.into_iter().map(|s| s as f32)),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(VolumeError::UnsupportedPixelType(
                "unsupported sample format".into(),
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CraniumError;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_stack_u16(path: &Path, width: u32, height: u32, pages: &[Vec<u16>]) {
        let mut file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(&mut file).unwrap();
        for page in pages {
            encoder
                .write_image::<colortype::Gray16>(width, height, page)
                .unwrap();
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = LoadVolume::new("missing.tif", 1).execute().unwrap_err();
        assert!(matches!(
            err,
            CraniumError::Volume(VolumeError::NotFound(ref p)) if p == Path::new("missing.tif")
        ));
    }

    #[test]
    fn zero_downsample_is_rejected_before_io() {
        let err = LoadVolume::new("missing.tif", 0).execute().unwrap_err();
        assert!(matches!(
            err,
            CraniumError::Volume(VolumeError::InvalidDownsample(0))
        ));
    }

    #[test]
    fn stack_pages_become_first_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        // 3 pages of 4x2 (width x height)
        let pages: Vec<Vec<u16>> = (0..3u16)
            .map(|p| (0..8u16).map(|i| p * 100 + i).collect())
            .collect();
        write_stack_u16(&path, 4, 2, &pages);

        let vol = LoadVolume::new(&path, 1).execute().unwrap();
        assert_eq!(vol.shape(), [3, 2, 4]);
        assert_eq!(vol.stats().raw_min, 0.0);
        assert_eq!(vol.stats().raw_max, 207.0);
        assert_eq!(vol.data()[[0, 0, 0]], 0.0);
        assert_eq!(vol.data()[[2, 1, 3]], 1.0);
        // page 1, row 1, col 0 -> raw 104
        assert!((vol.data()[[1, 1, 0]] - 104.0 / 207.0).abs() < 1e-6);
    }

    #[test]
    fn downsampled_stack_has_ceiling_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        let pages: Vec<Vec<u16>> = (0..5u16)
            .map(|p| (0..35u16).map(|i| p + i).collect())
            .collect();
        write_stack_u16(&path, 7, 5, &pages);

        let vol = LoadVolume::new(&path, 2).execute().unwrap();
        assert_eq!(vol.shape(), [3, 3, 4]);
        assert!(vol.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn constant_stack_loads_as_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.tif");
        let pages = vec![vec![500u16; 6]; 4];
        write_stack_u16(&path, 3, 2, &pages);

        let vol = LoadVolume::new(&path, 1).execute().unwrap();
        assert_eq!(vol.shape(), [4, 2, 3]);
        assert!(vol.stats().degenerate);
        assert!(vol.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();

        let err = LoadVolume::new(&path, 1).execute().unwrap_err();
        assert!(matches!(
            err,
            CraniumError::Volume(VolumeError::Decode { .. })
        ));
    }
}
