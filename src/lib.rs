//! # pvtools
//!
//! Utilities for two-photon imaging data acquired with PrairieView.
//!
//! ## Features
//!
//! - **TIFF decoding**: 8/16/32-bit grayscale and 8-bit RGB(A) strip images,
//!   in either byte order
//! - **Contrast scaling**: min/max and percentile stretching to 8 bits
//! - **8-bit output**: stride-aware palette bitmaps written as PNG or BMP
//! - **Projection**: per-pixel maximum over a stack of images
//! - **Scan metadata**: PrairieView XML parsed into typed scans
//!   (T-series, Z-series, TZ-series, line scans and more)
//! - **Reports**: per-folder analysis files and an HTML timeline of a day
//!   of experiments, including ABF recordings
//!
//! ## Architecture
//!
//! - [`io`] - Range readers over files and memory
//! - [`mod@format`] - TIFF parsing and decoding
//! - [`mod@image`] - Sample grids, scaling, projection and encoding
//! - [`pv`] - PrairieView XML metadata and scan types
//! - [`abf`] - ABF recording headers
//! - [`report`] - Analysis outputs and the timeline page
//! - [`config`] - CLI configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pvtools::Image;
//!
//! let mut image = Image::open("TSeries-001_Cycle00001_Ch2_000001.ome.tif")?;
//! image.auto_scale_percentile(0.05, 99.95);
//! image.save("frame.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod abf;
pub mod config;
pub mod error;
pub mod format;
pub mod image;
pub mod io;
pub mod pv;
pub mod report;

// Re-export commonly used types
pub use abf::{find_abfs, AbfHeader, AbfVersion};
pub use config::{Cli, Command};
pub use error::{AbfError, ImageError, IoError, ReportError, ScanError, TiffError};
pub use format::tiff::{decode_file, ByteOrder, TiffDecoder, TiffInfo};
pub use format::{is_tiff_header, is_tiff_path};
pub use image::{
    convert_file, convert_folder, project_channel, project_max, ConvertOptions, Image,
    IndexedBitmap, OutputFormat,
};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use pv::{PvState, PvXml, Scan, ScanFactory, ScanKind};
pub use report::{analyze_all, build_index, Experiment, Templates, Timeline};
