//! File format readers.
//!
//! Only TIFF is decoded here; PrairieView XML lives in [`crate::pv`] and ABF
//! headers in [`crate::abf`].

pub mod tiff;

use std::path::Path;

/// Whether a path names a TIFF file by extension (`.tif` / `.tiff`, any case).
pub fn is_tiff_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// Whether bytes begin with a TIFF or BigTIFF header.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    tiff::TiffHeader::parse(bytes, u64::MAX).is_ok()
}
