//! Baseline TIFF reading for microscope images.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. Tag values and pixel samples are both
//!   read in that order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets, BigTIFF
//!   64-bit ones. The parser handles both.
//!
//! - **Strips**: Image data is stored as a sequence of uncompressed strips,
//!   each holding `RowsPerStrip` rows. Only the first IFD is decoded.

mod decoder;
mod parser;
mod tags;
mod values;

pub use decoder::{decode_file, TiffDecoder, TiffInfo};
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, Photometric, SampleFormat, TiffTag};
pub use values::{parse_u64_array, ValueReader};
