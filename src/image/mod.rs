//! In-memory image grids and the operations the imaging tools apply to them.
//!
//! An [`Image`] is a fixed-size, row-major grid of `f64` samples. Decoding
//! produces one from a TIFF file; projections and other computations produce
//! one from a precomputed grid.

mod convert;
mod encoder;
mod projection;
mod scaling;

use std::fmt;
use std::ops::DivAssign;
use std::path::Path;

use serde::Serialize;

use crate::error::{ImageError, TiffError};

pub use convert::{convert_file, convert_folder, ConvertOptions};
pub use encoder::{clamp_to_u8, IndexedBitmap, OutputFormat};
pub use projection::{channel_paths, project_channel, project_max, ImageStack};
pub use scaling::{DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE};

/// Color layout of the source the samples came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorFormat {
    Grayscale,
    Rgb,
    Rgba,
    /// Built from a precomputed grid rather than decoded
    Computed,
}

/// Rectangular grid of intensity values.
///
/// Width and height are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    bits_per_sample: u16,
    samples_per_pixel: u16,
    format: ColorFormat,
    values: Vec<f64>,
}

impl Image {
    /// Build an image from a precomputed row-major grid.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self, ImageError> {
        if values.len() != width * height {
            return Err(ImageError::InvalidDimensions {
                width,
                height,
                len: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bits_per_sample: 64,
            samples_per_pixel: 1,
            format: ColorFormat::Computed,
            values,
        })
    }

    /// Build an image from rows of equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ImageError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        if rows.iter().any(|r| r.len() != width) {
            return Err(ImageError::InvalidDimensions {
                width,
                height: rows.len(),
                len: values.len(),
            });
        }
        Self::new(width, rows.len(), values)
    }

    /// Used by the TIFF decoder, which guarantees `values.len() == width * height`.
    pub(crate) fn from_decoded(
        width: usize,
        height: usize,
        bits_per_sample: u16,
        samples_per_pixel: u16,
        format: ColorFormat,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            format,
            values,
        }
    }

    /// Decode the first image of a TIFF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TiffError> {
        crate::format::tiff::decode_file(path)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    pub fn color_format(&self) -> ColorFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row-major samples.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sample at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the image.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.values[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.values[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[f64] {
        let start = y * self.width;
        &self.values[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Whether two images share width and height.
    pub fn same_size(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Mean of all samples, 0 for an empty image.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Mean of each row, top to bottom.
    ///
    /// For line scans each row is one scan line, so this is the intensity
    /// over time.
    pub fn collapse_horizontally(&self) -> Vec<f64> {
        if self.width == 0 {
            return vec![0.0; self.height];
        }
        self.rows()
            .map(|row| row.iter().sum::<f64>() / self.width as f64)
            .collect()
    }

    /// Write the image as an 8-bit grayscale PNG or BMP chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        IndexedBitmap::from_image(self).save(path)
    }
}

impl DivAssign<f64> for Image {
    fn div_assign(&mut self, divisor: f64) {
        for v in &mut self.values {
            *v /= divisor;
        }
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image {}x{}", self.width, self.height)
    }
}
