//! Per-folder automatic analysis of one acquisition.
//!
//! Outputs are written to `<folder>/autoanalysis/`. Files that already exist
//! are left alone unless the caller asks to overwrite them.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::dat::{write_columns, write_xrg, write_xy, DatLabels};
use super::pointscan::{csv_files, PointScanTrace};
use super::templates::html_escape;
use super::timeline::{TimelineIcon, TimelineItem};
use crate::error::ReportError;
use crate::format::is_tiff_path;
use crate::image::{channel_paths, convert_file, ConvertOptions, Image, ImageStack};
use crate::pv::{LineScan, Scan, ScanFactory, TSeries};

pub const AUTOANALYSIS_DIR: &str = "autoanalysis";
pub const REFERENCES_DIR: &str = "References";

/// Imaging channels and the color each is displayed as.
const CHANNELS: [(u8, &str); 2] = [(1, "red"), (2, "green")];

/// Full-range contrast stretch for report images.
const REPORT_SCALING: ConvertOptions = ConvertOptions {
    autoscale: true,
    low_percentile: 0.0,
    high_percentile: 100.0,
};

/// A titled group of analysis outputs, as paths relative to the report root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsFiles {
    pub title: String,
    pub paths: Vec<String>,
}

/// An acquisition folder paired with its scan metadata.
#[derive(Debug, Clone)]
pub struct Experiment {
    folder: PathBuf,
    scan: Scan,
}

impl Experiment {
    /// Classify `folder`. Folders without scan XML are [`ReportError::NotAScan`].
    pub fn open(folder: &Path) -> Result<Self, ReportError> {
        if !folder.is_dir() {
            return Err(ReportError::NotFound(folder.to_path_buf()));
        }
        match ScanFactory::from_folder(folder)? {
            Some(scan) => Ok(Self {
                folder: folder.to_path_buf(),
                scan,
            }),
            None => Err(ReportError::NotAScan(folder.to_path_buf())),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn scan(&self) -> &Scan {
        &self.scan
    }

    pub fn name(&self) -> String {
        self.folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn autoanalysis_dir(&self) -> PathBuf {
        self.folder.join(AUTOANALYSIS_DIR)
    }

    /// Generate every output for this scan type. Returns the files written.
    pub fn analyze(&self, overwrite: bool) -> Result<Vec<PathBuf>, ReportError> {
        let out = self.autoanalysis_dir();
        std::fs::create_dir_all(&out).map_err(|e| ReportError::io(&out, e))?;

        info!("Analyzing {} as {}", self.folder.display(), self.scan.kind());

        let mut written = Vec::new();
        match &self.scan {
            Scan::SingleImage(_) => {
                self.reference_images(&["Window"], overwrite, &mut written)?;
            }
            Scan::TSeries(series) => {
                self.reference_images(&["Window"], overwrite, &mut written)?;
                self.intensity_over_time(series, overwrite, &mut written)?;
            }
            Scan::LineScan(line) => {
                self.reference_images(&["Window"], overwrite, &mut written)?;
                self.line_scan_images(line, overwrite, &mut written)?;
            }
            Scan::TZSeries(_) => {
                self.reference_images(&["Window", "Reference"], overwrite, &mut written)?;
                self.depth_profiles(overwrite, &mut written)?;
            }
            Scan::ZSeries(_) => {
                self.projections(overwrite, &mut written)?;
            }
            Scan::PointScan(_) => {
                self.point_scan_traces(overwrite, &mut written)?;
            }
            Scan::MarkPoints(_) => {}
        }

        debug!(folder = %self.folder.display(), files = written.len(), "Analysis complete");
        Ok(written)
    }

    /// Output groups currently present in the autoanalysis folder.
    pub fn results_files(&self) -> Result<Vec<ResultsFiles>, ReportError> {
        let out = self.autoanalysis_dir();
        if !out.is_dir() {
            return Ok(Vec::new());
        }

        let names: BTreeSet<String> = std::fs::read_dir(&out)
            .map_err(|e| ReportError::io(&out, e))?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();

        let groups: [(&str, fn(&str) -> bool); 4] = [
            ("Reference Images", |n| n.starts_with("ref_") && n.ends_with(".png")),
            ("Maximum Projections", |n| n.starts_with("proj_") && n.ends_with(".png")),
            ("Data Images", |n| n.starts_with("data_") && n.ends_with(".png")),
            ("OriginLab Files", |n| n.ends_with(".dat")),
        ];

        let name = self.name();
        Ok(groups
            .iter()
            .map(|(title, accept)| ResultsFiles {
                title: title.to_string(),
                paths: names
                    .iter()
                    .filter(|n| accept(n.as_str()))
                    .map(|n| format!("{}/{}/{}", name, AUTOANALYSIS_DIR, n))
                    .collect(),
            })
            .filter(|group| !group.paths.is_empty())
            .collect())
    }

    /// Timeline entry with the scan summary and links to current outputs.
    pub fn timeline_item(&self) -> Result<TimelineItem, ReportError> {
        let mut content = format!("<pre>{}</pre>\n", html_escape(&self.scan.summary()));
        for group in self.results_files()? {
            let _ = writeln!(content, "<h4>{}</h4>", html_escape(&group.title));
            for path in &group.paths {
                let path = html_escape(path);
                if path.ends_with(".png") {
                    let _ = writeln!(content, "<a href=\"{0}\"><img src=\"{0}\"></a>", path);
                } else {
                    let _ = writeln!(content, "<a href=\"{0}\">{0}</a><br>", path);
                }
            }
        }

        Ok(TimelineItem::new(
            self.scan.started(),
            self.name(),
            content,
            TimelineIcon::for_scan(self.scan.kind()),
        ))
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Output path, or `None` when it exists and must be kept.
    fn target(&self, file_name: &str, overwrite: bool) -> Option<PathBuf> {
        let path = self.autoanalysis_dir().join(file_name);
        if path.exists() && !overwrite {
            debug!(path = %path.display(), "Output exists, skipping");
            None
        } else {
            Some(path)
        }
    }

    /// `References/*<marker>*.tif` converted to `ref_<name>.png`.
    fn reference_images(
        &self,
        markers: &[&str],
        overwrite: bool,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), ReportError> {
        let references = self.folder.join(REFERENCES_DIR);
        if !references.is_dir() {
            return Ok(());
        }

        for tif in tiffs_in(&references)? {
            let name = tif_stem(&tif);
            if !markers.iter().any(|m| name.contains(m)) {
                continue;
            }
            if let Some(dest) = self.target(&format!("ref_{}.png", name), overwrite) {
                convert_file(&tif, &dest, &REPORT_SCALING)?;
                written.push(dest);
            }
        }
        Ok(())
    }

    /// Max projection of each channel as `proj_<color>.png`.
    fn projections(&self, overwrite: bool, written: &mut Vec<PathBuf>) -> Result<(), ReportError> {
        for (channel, color) in CHANNELS {
            let paths = channel_paths(&self.folder, channel)?;
            if paths.is_empty() {
                continue;
            }
            if let Some(dest) = self.target(&format!("proj_{}.png", color), overwrite) {
                let mut projection = ImageStack::load(&paths)?.project_max()?;
                projection.auto_scale();
                projection.save(&dest)?;
                written.push(dest);
            }
        }
        Ok(())
    }

    /// Mean intensity of every frame against frame time.
    fn intensity_over_time(
        &self,
        series: &TSeries,
        overwrite: bool,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), ReportError> {
        let Some(dest) = self.target("intensity.dat", overwrite) else {
            return Ok(());
        };
        let red = mean_intensities(&channel_paths(&self.folder, 1)?)?;
        let green = mean_intensities(&channel_paths(&self.folder, 2)?)?;
        if red.is_empty() && green.is_empty() {
            return Ok(());
        }
        if write_xrg(&series.frame_times, &red, &green, &dest, "sec")? {
            written.push(dest);
        }
        Ok(())
    }

    /// Mean intensity of each depth, one column per cycle.
    fn depth_profiles(&self, overwrite: bool, written: &mut Vec<PathBuf>) -> Result<(), ReportError> {
        let tifs = tiffs_in(&self.folder)?;
        let cycles: BTreeSet<String> = tifs.iter().filter_map(|p| cycle_prefix(p)).collect();

        for (channel, _) in CHANNELS {
            let marker = format!("_Ch{}_", channel);
            let Some(dest) = self.target(&format!("intensity_ch{}.dat", channel), overwrite) else {
                continue;
            };

            let mut profiles = Vec::new();
            for cycle in &cycles {
                let stack: Vec<PathBuf> = tifs
                    .iter()
                    .filter(|p| cycle_prefix(p).as_deref() == Some(cycle.as_str()))
                    .filter(|p| file_name(p).contains(&marker))
                    .cloned()
                    .collect();
                if !stack.is_empty() {
                    debug!(cycle = %cycle, images = stack.len(), "Depth profile");
                    profiles.push(mean_intensities(&stack)?);
                }
            }

            if !profiles.is_empty() {
                let (main, rotated) = write_columns(&profiles, &dest)?;
                written.push(main);
                written.push(rotated);
            }
        }
        Ok(())
    }

    /// First image of each channel as `data_ch<n>_<name>.png`, plus its
    /// row-mean time course as `linescan_ch<n>.dat`.
    fn line_scan_images(
        &self,
        line: &LineScan,
        overwrite: bool,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), ReportError> {
        for (channel, _) in CHANNELS {
            let Some(first) = channel_paths(&self.folder, channel)?.into_iter().next() else {
                continue;
            };

            let png_name = format!("data_ch{}_{}.png", channel, tif_stem(&first));
            let png = self.target(&png_name, overwrite);
            let dat = self.target(&format!("linescan_ch{}.dat", channel), overwrite);
            if png.is_none() && dat.is_none() {
                continue;
            }

            let image = Image::open(&first).map_err(crate::error::ImageError::from)?;
            if let Some(dest) = png {
                let mut scaled = image.clone();
                scaled.auto_scale();
                scaled.save(&dest)?;
                written.push(dest);
            }
            if let Some(dest) = dat {
                let profile = image.collapse_horizontally();
                let times: Vec<f64> = (0..profile.len())
                    .map(|row| row as f64 * line.scan_line_period * 1000.0)
                    .collect();
                let labels = DatLabels::new("Time", "ms", "Intensity", "AFU");
                write_xy(&times, &profile, &dest, &labels)?;
                written.push(dest);
            }
        }
        Ok(())
    }

    /// Each exported CSV trace as `pointscan_<name>.dat`.
    fn point_scan_traces(&self, overwrite: bool, written: &mut Vec<PathBuf>) -> Result<(), ReportError> {
        for csv in csv_files(&self.folder)? {
            let stem = csv
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(dest) = self.target(&format!("pointscan_{}.dat", stem), overwrite) {
                if PointScanTrace::read(&csv)?.write_dat(&dest)? {
                    written.push(dest);
                }
            }
        }
        Ok(())
    }
}

fn mean_intensities(paths: &[PathBuf]) -> Result<Vec<f64>, ReportError> {
    paths
        .iter()
        .map(|path| {
            Image::open(path)
                .map(|image| image.mean())
                .map_err(|e| ReportError::Image(e.into()))
        })
        .collect()
}

fn tiffs_in(folder: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)
        .map_err(|e| ReportError::io(folder, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_tiff_path(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name without `.ome.tif` / `.tif`.
fn tif_stem(path: &Path) -> String {
    let name = file_name(path);
    let lower = name.to_ascii_lowercase();
    for suffix in [".ome.tiff", ".ome.tif", ".tiff", ".tif"] {
        if lower.ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name
}

/// `TSeries-001_Cycle00003` from `TSeries-001_Cycle00003_Ch1_000001.ome.tif`.
fn cycle_prefix(path: &Path) -> Option<String> {
    let name = file_name(path);
    name.find("_Ch").map(|i| name[..i].to_string())
}
