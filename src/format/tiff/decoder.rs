//! Strip image decoding.
//!
//! Reads the first IFD of a baseline TIFF and turns its uncompressed strips
//! into an [`Image`] grid. Supported layouts:
//!
//! | Photometric | Bits | Samples | Sample value |
//! |---|---|---|---|
//! | gray (0, 1) | 8 | 1 | byte, signed when SampleFormat says so |
//! | gray (0, 1) | 16 | 1 | u16 in file byte order |
//! | gray (0, 1) | 32 | 1 | f32 in file byte order |
//! | RGB (2) | 8 | 3 or 4 | mean of R, G, B; alpha ignored |
//!
//! Strips are concatenated in file order and rows are sliced from the
//! concatenation, so the row layout does not depend on RowsPerStrip.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

use crate::error::{IoError, TiffError};
use crate::image::{ColorFormat, Image};
use crate::io::{FileRangeReader, RangeReader};

use super::parser::{ByteOrder, Ifd, TiffHeader};
use super::tags::{Compression, Photometric, SampleFormat, TiffTag};
use super::values::ValueReader;

// =============================================================================
// TiffInfo
// =============================================================================

/// Descriptive metadata of the decoded image directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiffInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub photometric: u16,
    pub big_endian: bool,
    pub bigtiff: bool,
    pub rows_per_strip: u32,
    pub strip_count: usize,
    /// Software tag, when the writer recorded one
    pub software: Option<String>,
}

impl TiffInfo {
    /// Bytes in one row of packed samples, `None` if the declared width
    /// overflows.
    pub fn row_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.samples_per_pixel as usize)?
            .checked_mul(self.bits_per_sample as usize / 8)
    }

    /// Bytes the strips must supply to fill the image.
    pub fn image_bytes(&self) -> Option<usize> {
        self.row_bytes()?.checked_mul(self.height as usize)
    }
}

/// How each pixel's bytes turn into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleLayout {
    Gray8 { signed: bool },
    Gray16 { signed: bool },
    Gray32Float,
    Gray32Int { signed: bool },
    Rgb8 { samples: usize },
}

impl SampleLayout {
    fn select(
        photometric: Photometric,
        bits: u16,
        samples: u16,
        format: SampleFormat,
    ) -> Result<Self, TiffError> {
        if photometric == Photometric::Rgb {
            if bits != 8 {
                return Err(TiffError::UnsupportedDepth(bits));
            }
            if samples != 3 && samples != 4 {
                return Err(TiffError::UnsupportedSampleCount(samples));
            }
            return Ok(SampleLayout::Rgb8 {
                samples: samples as usize,
            });
        }

        if samples != 1 {
            return Err(TiffError::UnsupportedSampleCount(samples));
        }

        match (bits, format) {
            (8, SampleFormat::Unsigned) => Ok(SampleLayout::Gray8 { signed: false }),
            (8, SampleFormat::Signed) => Ok(SampleLayout::Gray8 { signed: true }),
            (16, SampleFormat::Unsigned) => Ok(SampleLayout::Gray16 { signed: false }),
            (16, SampleFormat::Signed) => Ok(SampleLayout::Gray16 { signed: true }),
            (32, SampleFormat::Float) => Ok(SampleLayout::Gray32Float),
            (32, SampleFormat::Unsigned) => Ok(SampleLayout::Gray32Int { signed: false }),
            (32, SampleFormat::Signed) => Ok(SampleLayout::Gray32Int { signed: true }),
            _ => Err(TiffError::UnsupportedDepth(bits)),
        }
    }

    /// Value of the pixel whose bytes are `px`.
    #[inline]
    fn sample(self, px: &[u8], order: ByteOrder) -> f64 {
        match self {
            SampleLayout::Gray8 { signed: false } => px[0] as f64,
            SampleLayout::Gray8 { signed: true } => px[0] as i8 as f64,
            SampleLayout::Gray16 { signed: false } => order.read_u16(px) as f64,
            SampleLayout::Gray16 { signed: true } => order.read_u16(px) as i16 as f64,
            SampleLayout::Gray32Float => order.read_f32(px) as f64,
            SampleLayout::Gray32Int { signed: false } => order.read_u32(px) as f64,
            SampleLayout::Gray32Int { signed: true } => order.read_u32(px) as i32 as f64,
            SampleLayout::Rgb8 { .. } => (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0,
        }
    }

    fn color_format(self) -> ColorFormat {
        match self {
            SampleLayout::Rgb8 { samples: 4 } => ColorFormat::Rgba,
            SampleLayout::Rgb8 { .. } => ColorFormat::Rgb,
            _ => ColorFormat::Grayscale,
        }
    }
}

// =============================================================================
// TiffDecoder
// =============================================================================

/// Decoder for the first image directory of a TIFF file.
///
/// Construction parses the header and IFD and validates the layout, so an
/// unsupported file fails before any strip data is read.
#[derive(Debug)]
pub struct TiffDecoder<R: RangeReader> {
    reader: R,
    header: TiffHeader,
    info: TiffInfo,
    layout: SampleLayout,
    row_bytes: usize,
    image_bytes: usize,
    strip_offsets: Vec<u64>,
    strip_byte_counts: Vec<u64>,
}

impl TiffDecoder<FileRangeReader> {
    /// Open a TIFF file from disk.
    ///
    /// The file handle is held by the decoder and released when it drops.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TiffError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TiffError::NotFound(path.to_path_buf()));
        }
        let reader = FileRangeReader::open(path).map_err(|e| match e {
            IoError::NotFound(_) => TiffError::NotFound(path.to_path_buf()),
            other => TiffError::Io(other),
        })?;
        Self::new(reader)
    }
}

impl<R: RangeReader> TiffDecoder<R> {
    /// Parse the header and first IFD from any range reader.
    pub fn new(reader: R) -> Result<Self, TiffError> {
        let header = TiffHeader::read(&reader)?;
        let ifd = Ifd::read_at(&reader, &header, header.first_ifd_offset)?;
        let values = ValueReader::new(&reader, &header);
        let order = header.byte_order;

        let width = required_u32(&values, &ifd, TiffTag::ImageWidth)?;
        let height = required_u32(&values, &ifd, TiffTag::ImageLength)?;

        let compression = ifd.compression(order).unwrap_or(Compression::None as u16);
        if compression != Compression::None as u16 {
            let name = Compression::from_u16(compression)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| compression.to_string());
            return Err(TiffError::UnsupportedCompression(name));
        }

        let planar = ifd.planar_configuration(order).unwrap_or(1);
        if planar != 1 {
            return Err(TiffError::UnsupportedPlanarConfiguration(planar));
        }

        let photometric_raw = ifd.photometric(order).unwrap_or(1);
        let photometric = Photometric::from_u16(photometric_raw)
            .ok_or(TiffError::UnsupportedPhotometric(photometric_raw))?;

        let samples_per_pixel = ifd.samples_per_pixel(order).unwrap_or(1);
        let bits_per_sample = bits_per_sample(&values, &ifd)?;
        let sample_format = match ifd.get_u32(TiffTag::SampleFormat, order) {
            Some(raw) => SampleFormat::from_u16(raw as u16).ok_or(TiffError::InvalidTagValue {
                tag: TiffTag::SampleFormat.name(),
                message: format!("unknown sample format {}", raw),
            })?,
            // 32-bit acquisitions without the tag are floating point images
            None if bits_per_sample == 32 => SampleFormat::Float,
            None => SampleFormat::Unsigned,
        };

        let layout =
            SampleLayout::select(photometric, bits_per_sample, samples_per_pixel, sample_format)?;

        let rows_per_strip = ifd
            .rows_per_strip(order)
            .unwrap_or(height)
            .clamp(1, height.max(1));

        let strip_offsets = ifd
            .get_entry_by_tag(TiffTag::StripOffsets)
            .ok_or(TiffError::MissingTag(TiffTag::StripOffsets.name()))
            .and_then(|entry| values.read_u64_array(entry))?;

        let software = match ifd.get_entry_by_tag(TiffTag::Software) {
            Some(entry) => values.read_string(entry).ok(),
            None => None,
        };

        let info = TiffInfo {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            photometric: photometric_raw,
            big_endian: order == ByteOrder::BigEndian,
            bigtiff: header.is_bigtiff,
            rows_per_strip,
            strip_count: strip_offsets.len(),
            software,
        };

        let (row_bytes, image_bytes) = match (info.row_bytes(), info.image_bytes()) {
            (Some(row), Some(image)) => (row, image),
            _ => {
                return Err(TiffError::InvalidTagValue {
                    tag: TiffTag::ImageWidth.name(),
                    message: format!("{} x {} image size overflows", width, height),
                })
            }
        };
        if image_bytes as u64 > reader.size() {
            return Err(TiffError::TruncatedData {
                expected: image_bytes as u64,
                actual: reader.size(),
            });
        }

        let strip_byte_counts = match ifd.get_entry_by_tag(TiffTag::StripByteCounts) {
            Some(entry) => values.read_u64_array(entry)?,
            None => implied_strip_byte_counts(&info, row_bytes, image_bytes),
        };
        if strip_byte_counts.len() != strip_offsets.len() {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::StripByteCounts.name(),
                message: format!(
                    "{} byte counts for {} strips",
                    strip_byte_counts.len(),
                    strip_offsets.len()
                ),
            });
        }
        let declared = strip_byte_counts
            .iter()
            .fold(0u64, |total, &count| total.saturating_add(count));
        if declared < image_bytes as u64 {
            return Err(TiffError::TruncatedData {
                expected: image_bytes as u64,
                actual: declared,
            });
        }

        debug!(
            source = reader.identifier(),
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            photometric = photometric_raw,
            strips = strip_offsets.len(),
            "Parsed TIFF directory"
        );

        Ok(Self {
            reader,
            header,
            info,
            layout,
            row_bytes,
            image_bytes,
            strip_offsets,
            strip_byte_counts,
        })
    }

    pub fn info(&self) -> &TiffInfo {
        &self.info
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Concatenate strip data up to the size of the full image.
    ///
    /// Padding past the last row is dropped; a short total fails with
    /// `TruncatedData`. The image size was checked against the file size
    /// when the decoder was built.
    pub fn read_strips(&self) -> Result<Bytes, TiffError> {
        let expected = self.image_bytes;
        let mut data = BytesMut::with_capacity(expected);

        for (&offset, &count) in self.strip_offsets.iter().zip(&self.strip_byte_counts) {
            let remaining = expected - data.len();
            if remaining == 0 {
                break;
            }
            let len = (count as usize).min(remaining);
            if len == 0 {
                continue;
            }
            let strip = self.reader.read_exact_at(offset, len).map_err(|e| match e {
                IoError::RangeOutOfBounds { .. } => TiffError::TruncatedData {
                    expected: expected as u64,
                    actual: (data.len() as u64)
                        + self.reader.size().saturating_sub(offset).min(len as u64),
                },
                other => TiffError::Io(other),
            })?;
            data.extend_from_slice(&strip);
        }

        if data.len() < expected {
            return Err(TiffError::TruncatedData {
                expected: expected as u64,
                actual: data.len() as u64,
            });
        }

        Ok(data.freeze())
    }

    /// Decode the image into a row-major grid of values.
    pub fn decode(&self) -> Result<Image, TiffError> {
        let data = self.read_strips()?;
        let order = self.header.byte_order;
        let layout = self.layout;

        let pixel_bytes =
            self.info.samples_per_pixel as usize * (self.info.bits_per_sample as usize / 8);
        let row_bytes = self.row_bytes;

        let mut values = Vec::with_capacity(data.len() / pixel_bytes.max(1));
        if row_bytes > 0 {
            for row in data.chunks_exact(row_bytes) {
                values.extend(
                    row.chunks_exact(pixel_bytes)
                        .map(|px| layout.sample(px, order)),
                );
            }
        }

        Ok(Image::from_decoded(
            self.info.width as usize,
            self.info.height as usize,
            self.info.bits_per_sample,
            self.info.samples_per_pixel,
            layout.color_format(),
            values,
        ))
    }
}

/// Decode the first image of a TIFF file.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Image, TiffError> {
    TiffDecoder::open(path)?.decode()
}

fn required_u32<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
    tag: TiffTag,
) -> Result<u32, TiffError> {
    let entry = ifd
        .get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))?;
    let value = values.read_u64(entry)?;
    u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
        tag: tag.name(),
        message: format!("{} does not fit in 32 bits", value),
    })
}

/// BitsPerSample holds one value per sample; all must agree.
fn bits_per_sample<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
) -> Result<u16, TiffError> {
    let Some(entry) = ifd.get_entry_by_tag(TiffTag::BitsPerSample) else {
        return Ok(1);
    };
    let bits = values.read_u64_array(entry)?;
    let first = bits.first().copied().unwrap_or(1);
    if let Some(&other) = bits.iter().find(|&&b| b != first) {
        return Err(TiffError::UnsupportedDepth(other as u16));
    }
    Ok(first as u16)
}

fn implied_strip_byte_counts(info: &TiffInfo, row_bytes: usize, image_bytes: usize) -> Vec<u64> {
    let strip_bytes = (row_bytes as u64).saturating_mul(info.rows_per_strip as u64);
    let mut remaining = image_bytes as u64;
    (0..info.strip_count)
        .map(|_| {
            let count = strip_bytes.min(remaining);
            remaining -= count;
            count
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
