//! Raster trait and the owned luminance grid.

/// Read access to a grid of intensity samples.
///
/// Row 0 is the top of the picture. Implementations must be cheap to
/// sample; the decoder reads every data sample individually.
pub trait Raster {
    /// Samples per row.
    fn width(&self) -> usize;

    /// Number of rows.
    fn height(&self) -> usize;

    /// Intensity at column `x`, row `y`. Both must be in range.
    fn sample(&self, x: usize, y: usize) -> u8;

    /// Intensity at a possibly out-of-range position.
    #[inline]
    fn get(&self, x: isize, y: usize) -> Option<u8> {
        if x < 0 || x as usize >= self.width() || y >= self.height() {
            None
        } else {
            Some(self.sample(x as usize, y))
        }
    }
}

/// Raster construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    /// Buffer length is not `width × height`.
    #[error("sample buffer holds {actual} values, {width}x{height} needs {expected}")]
    SizeMismatch {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Samples the dimensions need.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
}

/// An owned row-major grid of 8-bit luminance samples.
#[derive(Clone, PartialEq, Eq)]
pub struct LumaRaster {
    samples: Vec<u8>,
    width: usize,
    height: usize,
}

impl LumaRaster {
    /// Wraps a row-major sample buffer.
    pub fn new(samples: Vec<u8>, width: usize, height: usize) -> Result<Self, RasterError> {
        let expected = width * height;
        if samples.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            samples,
            width,
            height,
        })
    }

    /// Creates a raster filled with one intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            samples: vec![value; width * height],
            width,
            height,
        }
    }

    /// Creates a raster from a per-sample function.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self {
            samples,
            width,
            height,
        }
    }

    /// Reduces packed RGB triples to their red channel.
    pub fn from_rgb24(pixels: &[u8], width: usize, height: usize) -> Result<Self, RasterError> {
        let expected = width * height * 3;
        if pixels.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            samples: pixels.chunks_exact(3).map(|rgb| rgb[0]).collect(),
            width,
            height,
        })
    }

    /// Returns the raw sample buffer.
    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Returns one row of samples.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.samples[y * self.width..(y + 1) * self.width]
    }

    /// Returns a mutable row of samples.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.samples[y * self.width..(y + 1) * self.width]
    }
}

impl Raster for LumaRaster {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn sample(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width + x]
    }
}

impl std::fmt::Debug for LumaRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LumaRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sample_bytes", &self.samples.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster = LumaRaster::new(vec![0u8; 640 * 480], 640, 480).unwrap();

        assert_eq!(raster.width(), 640);
        assert_eq!(raster.height(), 480);
        assert_eq!(raster.samples().len(), 640 * 480);
    }

    #[test]
    fn test_raster_invalid_size() {
        let result = LumaRaster::new(vec![0u8; 100], 640, 480);

        assert!(matches!(
            result,
            Err(RasterError::SizeMismatch { expected: 307_200, actual: 100, .. })
        ));
    }

    #[test]
    fn test_row_major_indexing() {
        let raster = LumaRaster::from_fn(4, 3, |x, y| (y * 10 + x) as u8);

        assert_eq!(raster.sample(0, 0), 0);
        assert_eq!(raster.sample(3, 0), 3);
        assert_eq!(raster.sample(1, 2), 21);
        assert_eq!(raster.row(1), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_get_out_of_range() {
        let raster = LumaRaster::filled(4, 2, 7);

        assert_eq!(raster.get(0, 0), Some(7));
        assert_eq!(raster.get(-1, 0), None);
        assert_eq!(raster.get(4, 0), None);
        assert_eq!(raster.get(0, 2), None);
    }

    #[test]
    fn test_rgb_keeps_red_channel() {
        let pixels = [0x10, 0x20, 0x30, 0xF0, 0x00, 0x00];
        let raster = LumaRaster::from_rgb24(&pixels, 2, 1).unwrap();

        assert_eq!(raster.row(0), &[0x10, 0xF0]);
    }
}
