//! Whole-folder analysis and the timeline index page.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::builder::ReportBuilder;
use super::experiment::Experiment;
use super::templates::{html_escape, Templates};
use super::timeline::{Timeline, TimelineIcon, TimelineItem};
use crate::abf::{find_abfs, AbfHeader};
use crate::error::ReportError;

pub const INDEX_FILE: &str = "index.html";
pub const REPORT_TITLE: &str = "2P Report";

/// ABF recordings live next to the folder of scan folders.
pub const ABF_FOLDER: &str = "abfs";

/// Analyze every scan subfolder of `folder`.
///
/// A subfolder that fails is logged and skipped. Returns the experiments
/// that were analyzed.
pub fn analyze_all(folder: &Path, overwrite: bool) -> Result<Vec<Experiment>, ReportError> {
    let mut analyzed = Vec::new();
    for subfolder in subfolders(folder)? {
        let experiment = match Experiment::open(&subfolder) {
            Ok(experiment) => experiment,
            Err(ReportError::NotAScan(path)) => {
                debug!(folder = %path.display(), "Not a scan folder, skipping");
                continue;
            }
            Err(e) => {
                warn!("Skipping {}: {}", subfolder.display(), e);
                continue;
            }
        };

        match experiment.analyze(overwrite) {
            Ok(written) => {
                info!("{}: {} new files", experiment.name(), written.len());
                analyzed.push(experiment);
            }
            Err(e) => warn!("Analysis of {} failed: {}", subfolder.display(), e),
        }
    }
    Ok(analyzed)
}

/// Write `<folder>/index.html`: a timeline of the scan subfolders and of the
/// ABF recordings in `<folder>/../abfs`.
pub fn build_index(folder: &Path, templates: &Templates) -> Result<PathBuf, ReportError> {
    let mut items = Vec::new();

    for subfolder in subfolders(folder)? {
        match Experiment::open(&subfolder).and_then(|e| e.timeline_item()) {
            Ok(item) => items.push(item),
            Err(ReportError::NotAScan(_)) => {}
            Err(e) => warn!("Leaving {} off the timeline: {}", subfolder.display(), e),
        }
    }

    let abf_folder = folder.join("..").join(ABF_FOLDER);
    for abf in find_abfs(&abf_folder) {
        match AbfHeader::read(&abf) {
            Ok(header) => items.push(abf_item(&header)),
            Err(e) => warn!("Leaving {} off the timeline: {}", abf.display(), e),
        }
    }

    if items.is_empty() {
        return Err(ReportError::EmptyTimeline(folder.to_path_buf()));
    }

    let timeline = Timeline::sorted_with_spacers(items);
    let mut builder = ReportBuilder::new(
        templates.clone(),
        REPORT_TITLE,
        &folder.display().to_string(),
    );
    builder.add_timeline(&timeline);

    let index = folder.join(INDEX_FILE);
    builder.save(&index)?;
    Ok(index)
}

/// Analyze all subfolders, then write the index page.
pub fn run(folder: &Path, overwrite: bool, templates: &Templates) -> Result<PathBuf, ReportError> {
    let analyzed = analyze_all(folder, overwrite)?;
    info!("Analyzed {} scan folders in {}", analyzed.len(), folder.display());
    build_index(folder, templates)
}

fn abf_item(header: &AbfHeader) -> TimelineItem {
    let name = header
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut content = String::from("<pre>");
    let _ = writeln!(content, "File: {}", html_escape(&header.path.display().to_string()));
    let _ = writeln!(content, "Format: {:?}", header.version);
    let _ = writeln!(content, "Recording started: {}", header.started);
    content.push_str("</pre>");

    TimelineItem::new(header.started, name, content, TimelineIcon::Abf)
}

/// Immediate subdirectories, sorted by name.
fn subfolders(folder: &Path) -> Result<Vec<PathBuf>, ReportError> {
    if !folder.is_dir() {
        return Err(ReportError::NotFound(folder.to_path_buf()));
    }
    let mut folders: Vec<PathBuf> = std::fs::read_dir(folder)
        .map_err(|e| ReportError::io(folder, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();
    Ok(folders)
}
