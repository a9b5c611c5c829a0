//! Maximum-intensity projection of image stacks.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{ColorFormat, Image};
use crate::error::ImageError;
use crate::format::is_tiff_path;

/// Per-pixel maximum across a stack of equally sized images.
///
/// Dimensions are checked for the whole stack before any pixel is visited.
/// A stack of one returns its values unchanged.
pub fn project_max(images: &[Image]) -> Result<Image, ImageError> {
    let first = images.first().ok_or(ImageError::EmptyStack)?;

    if let Some(odd) = images.iter().find(|img| !img.same_size(first)) {
        return Err(ImageError::DimensionMismatch {
            expected_width: first.width(),
            expected_height: first.height(),
            width: odd.width(),
            height: odd.height(),
        });
    }

    let mut projection = first.clone();
    for image in &images[1..] {
        for (p, &v) in projection.values.iter_mut().zip(image.values()) {
            if v > *p {
                *p = v;
            }
        }
    }
    projection.format = ColorFormat::Computed;

    debug!(
        images = images.len(),
        width = projection.width(),
        height = projection.height(),
        "Projected stack"
    );
    Ok(projection)
}

// =============================================================================
// ImageStack
// =============================================================================

/// Images decoded from a list of files, kept in load order.
#[derive(Debug, Clone)]
pub struct ImageStack {
    paths: Vec<PathBuf>,
    images: Vec<Image>,
}

impl ImageStack {
    /// Decode every path. Fails on the first file that cannot be decoded.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ImageError> {
        info!("Loading {} images", paths.len());
        let mut loaded = Vec::with_capacity(paths.len());
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            debug!(path = %path.display(), "Loading image");
            images.push(Image::open(path)?);
            loaded.push(path.to_path_buf());
        }
        Ok(Self {
            paths: loaded,
            images,
        })
    }

    pub fn from_images(images: Vec<Image>) -> Self {
        Self {
            paths: Vec::new(),
            images,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn project_max(&self) -> Result<Image, ImageError> {
        project_max(&self.images)
    }

    /// Mean intensity of each image, in stack order.
    pub fn means(&self) -> Vec<f64> {
        self.images.iter().map(Image::mean).collect()
    }
}

// =============================================================================
// Channel projection of acquisition folders
// =============================================================================

/// TIFF files of one channel in a folder (`*_Ch{channel}_*.tif`), sorted by name.
pub fn channel_paths(folder: &Path, channel: u8) -> Result<Vec<PathBuf>, ImageError> {
    let marker = format!("_Ch{}_", channel);
    let entries = std::fs::read_dir(folder).map_err(|e| ImageError::io(folder, &e))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_tiff_path(path))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains(&marker))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Project one channel of an acquisition folder and save it as
/// `<folder name>_projection_Ch{channel}.png` in each of `destinations`.
///
/// Samples are divided by `divisor` before saving. Returns the written paths.
pub fn project_channel(
    folder: &Path,
    channel: u8,
    divisor: f64,
    destinations: &[PathBuf],
) -> Result<Vec<PathBuf>, ImageError> {
    let paths = channel_paths(folder, channel)?;
    let folder_name = folder
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ImageError::InvalidPath(folder.display().to_string()))?;
    info!(
        "{}: projecting {} channel {} images",
        folder_name,
        paths.len(),
        channel
    );

    let mut projection = ImageStack::load(&paths)?.project_max()?;
    projection /= divisor;

    let file_name = format!("{}_projection_Ch{}.png", folder_name, channel);
    let mut written = Vec::with_capacity(destinations.len());
    for dest in destinations {
        std::fs::create_dir_all(dest).map_err(|e| ImageError::io(dest, &e))?;
        let out = dest.join(&file_name);
        projection.save(&out)?;
        written.push(out);
    }
    Ok(written)
}
