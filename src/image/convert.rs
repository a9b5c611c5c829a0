//! TIFF to PNG/BMP conversion of single files and folders.

use std::path::{Path, PathBuf};

use tracing::info;

use super::scaling::{DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE};
use super::Image;
use crate::error::ImageError;
use crate::format::is_tiff_path;

/// How samples are scaled before being packed to 8 bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    /// Percentile contrast stretch; when false, values are clamped as-is
    pub autoscale: bool,
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            autoscale: true,
            low_percentile: DEFAULT_LOW_PERCENTILE,
            high_percentile: DEFAULT_HIGH_PERCENTILE,
        }
    }
}

/// Convert one TIFF file to an 8-bit PNG or BMP.
pub fn convert_file(input: &Path, output: &Path, options: &ConvertOptions) -> Result<(), ImageError> {
    if !is_tiff_path(input) {
        return Err(ImageError::InvalidPath(format!(
            "input file must end with .tif: {}",
            input.display()
        )));
    }
    if output.is_dir() {
        return Err(ImageError::InvalidPath(format!(
            "output path must be a file: {}",
            output.display()
        )));
    }

    info!(
        "{} -> {}",
        input.display(),
        output.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    );

    let mut image = Image::open(input)?;
    if options.autoscale {
        image.auto_scale_percentile(options.low_percentile, options.high_percentile);
    }
    image.save(output)
}

/// Convert every TIFF in `input` into `<name>.png` inside the existing
/// folder `output`. Returns the written paths in name order.
pub fn convert_folder(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<Vec<PathBuf>, ImageError> {
    if !output.is_dir() {
        return Err(ImageError::InvalidPath(format!(
            "output path must be an existing folder: {}",
            output.display()
        )));
    }

    let entries = std::fs::read_dir(input).map_err(|e| ImageError::io(input, &e))?;
    let mut sources: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_tiff_path(path))
        .collect();
    sources.sort();

    info!("Converting {} TIFF files from {}", sources.len(), input.display());

    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dest = output.join(format!("{}.png", stem));
        convert_file(&source, &dest, options)?;
        written.push(dest);
    }
    Ok(written)
}
