//! 8-bit bitmap packing and PNG/BMP output.
//!
//! Samples are clamped to `[0, 255]` and truncated to bytes, packed into a
//! palette-indexed raster whose rows are padded to a multiple of 4 bytes,
//! then composited through the grayscale palette into an RGB raster of the
//! logical width for encoding.

use std::io::Cursor;
use std::path::Path;

use ::image::{ImageFormat, Rgb, RgbImage};
use bytes::Bytes;
use tracing::debug;

use super::Image;
use crate::error::ImageError;

/// Row alignment of the packed raster, in bytes.
const ROW_ALIGNMENT: usize = 4;

/// Clamp a sample to `[0, 255]` and truncate it to a byte.
///
/// NaN maps to 0.
#[inline]
pub fn clamp_to_u8(value: f64) -> u8 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value as u8
    }
}

// =============================================================================
// OutputFormat
// =============================================================================

/// Encodings an [`IndexedBitmap`] can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Bmp,
}

impl OutputFormat {
    /// Pick the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(OutputFormat::Png),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(ImageError::UnsupportedOutput(path.display().to_string())),
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

// =============================================================================
// IndexedBitmap
// =============================================================================

/// Palette-indexed 8-bit raster with 4-byte aligned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBitmap {
    width: usize,
    height: usize,
    stride: usize,
    pixels: Vec<u8>,
    palette: [[u8; 4]; 256],
}

impl IndexedBitmap {
    /// Pack an image's samples with the identity grayscale palette.
    pub fn from_image(image: &Image) -> Self {
        let width = image.width();
        let height = image.height();
        let stride = Self::stride_for(width);

        let mut pixels = vec![0u8; stride * height];
        for (y, row) in image.rows().enumerate() {
            let dest = &mut pixels[y * stride..y * stride + width];
            for (d, &v) in dest.iter_mut().zip(row) {
                *d = clamp_to_u8(v);
            }
        }

        Self {
            width,
            height,
            stride,
            pixels,
            palette: grayscale_palette(),
        }
    }

    /// Row length in bytes for a given pixel width.
    pub const fn stride_for(width: usize) -> usize {
        (width + ROW_ALIGNMENT - 1) / ROW_ALIGNMENT * ROW_ALIGNMENT
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Packed raster including row padding.
    pub fn raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Palette entries as `[r, g, b, a]`.
    pub fn palette(&self) -> &[[u8; 4]; 256] {
        &self.palette
    }

    /// Palette indices of row `y`, without padding.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.stride..y * self.stride + self.width]
    }

    pub fn index_at(&self, x: usize, y: usize) -> u8 {
        self.row(y)[x]
    }

    /// Composite through the palette into an RGB raster of the logical width.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let [r, g, b, _] = self.palette[self.index_at(x as usize, y as usize) as usize];
            Rgb([r, g, b])
        })
    }

    /// Encode to an in-memory file.
    pub fn encode(&self, format: OutputFormat) -> Result<Bytes, ImageError> {
        let mut output = Cursor::new(Vec::new());
        self.to_rgb()
            .write_to(&mut output, format.image_format())
            .map_err(|e| ImageError::EncodeError {
                message: e.to_string(),
            })?;
        Ok(Bytes::from(output.into_inner()))
    }

    /// Encode and write to `path`, format chosen by extension.
    ///
    /// Existing files are overwritten.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;
        let encoded = self.encode(format)?;
        std::fs::write(path, &encoded).map_err(|e| ImageError::io(path, &e))?;
        debug!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            bytes = encoded.len(),
            "Saved bitmap"
        );
        Ok(())
    }
}

fn grayscale_palette() -> [[u8; 4]; 256] {
    let mut palette = [[0u8; 4]; 256];
    for (i, entry) in palette.iter_mut().enumerate() {
        let v = i as u8;
        *entry = [v, v, v, 255];
    }
    palette
}

// =============================================================================
// Tests
// =============================================================================
