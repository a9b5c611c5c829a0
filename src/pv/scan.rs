//! Scan-type classification and the per-type metadata views.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use tracing::{debug, info};

use super::state::PvState;
use super::xml::{read_text, PvXml, Sequence};
use crate::error::{IoError, ScanError};

/// Suffix of the stimulation pattern file written next to a MarkPoints scan.
const MARK_POINTS_PATTERN_SUFFIX: &str = "_MarkPoints.xml";

const SECONDS_PER_DAY: f64 = 86_400.0;

// =============================================================================
// ScanKind
// =============================================================================

/// Acquisition type, as identified by the sequence marker in the XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScanKind {
    TSeries,
    TZSeries,
    ZSeries,
    SingleImage,
    LineScan,
    MarkPoints,
    PointScan,
}

/// Markers in match order. A TZSeries document also contains `ZSeries`
/// text, so the more specific markers come first.
const MARKERS: &[(&str, ScanKind)] = &[
    ("type=\"TSeries Timed Element\"", ScanKind::TSeries),
    ("type=\"TSeries ZSeries Element\"", ScanKind::TZSeries),
    ("type=\"ZSeries\"", ScanKind::ZSeries),
    ("type=\"Single\"", ScanKind::SingleImage),
    ("type=\"Linescan\"", ScanKind::LineScan),
    ("type=\"MarkPoints\"", ScanKind::MarkPoints),
    ("type=\"Point Scan\"", ScanKind::PointScan),
];

impl ScanKind {
    /// Classify a document by the first marker found in its text.
    pub fn detect(xml_text: &str) -> Result<Self, ScanError> {
        MARKERS
            .iter()
            .find(|(marker, _)| xml_text.contains(marker))
            .map(|&(_, kind)| kind)
            .ok_or_else(|| {
                let root = xml_text
                    .find("<PVScan")
                    .map(|start| {
                        let tail = &xml_text[start..];
                        tail[..tail.find('>').unwrap_or(tail.len())].to_string()
                    })
                    .unwrap_or_else(|| "no <PVScan> element".to_string());
                ScanError::UnsupportedScanType(root)
            })
    }

    /// The `type` attribute of this kind's first `Sequence`.
    pub fn sequence_type(&self) -> &'static str {
        match self {
            ScanKind::TSeries => "TSeries Timed Element",
            ScanKind::TZSeries => "TSeries ZSeries Element",
            ScanKind::ZSeries => "ZSeries",
            ScanKind::SingleImage => "Single",
            ScanKind::LineScan => "Linescan",
            ScanKind::MarkPoints => "MarkPoints",
            ScanKind::PointScan => "Point Scan",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanKind::TSeries => "TSeries",
            ScanKind::TZSeries => "TZSeries",
            ScanKind::ZSeries => "ZSeries",
            ScanKind::SingleImage => "SingleImage",
            ScanKind::LineScan => "LineScan",
            ScanKind::MarkPoints => "MarkPoints",
            ScanKind::PointScan => "PointScan",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Scan variants
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleImage {
    pub state: PvState,
}

/// Repeated frames of one field of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TSeries {
    pub state: PvState,
    /// Seconds since the first frame
    pub frame_times: Vec<f64>,
}

impl TSeries {
    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    /// Time between the first two frames; NaN with fewer than two frames.
    pub fn frame_period(&self) -> f64 {
        match self.frame_times.as_slice() {
            [t0, t1, ..] => t1 - t0,
            _ => f64::NAN,
        }
    }

    pub fn total_time(&self) -> f64 {
        self.frame_period() * self.frame_count() as f64
    }
}

/// One stack of frames at increasing depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZSeries {
    pub state: PvState,
    /// Seconds since the scan started, rounded to microseconds
    pub frame_times: Vec<f64>,
}

impl ZSeries {
    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    /// Time between the first two frames, rounded to 10 microseconds.
    pub fn frame_period(&self) -> f64 {
        match self.frame_times.as_slice() {
            [t0, t1, ..] => round_to(t1 - t0, 5),
            _ => f64::NAN,
        }
    }

    pub fn total_time(&self) -> f64 {
        self.frame_period() * self.frame_count() as f64
    }
}

/// Repeated Z stacks; one sequence per stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TZSeries {
    pub state: PvState,
    /// Seconds from the first stack's start to each stack's start
    pub sequence_times: Vec<f64>,
    /// Frames in each stack
    pub frames_per_sequence: Vec<usize>,
}

impl TZSeries {
    pub fn sequence_count(&self) -> usize {
        self.sequence_times.len()
    }

    pub fn stack_period(&self) -> f64 {
        match self.sequence_times.as_slice() {
            [t0, t1, ..] => t1 - t0,
            _ => f64::NAN,
        }
    }

    pub fn total_time(&self) -> f64 {
        self.stack_period() * self.sequence_count() as f64
    }
}

/// Repeated scanning of one line; each image row is one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineScan {
    pub state: PvState,
    pub sequence_count: usize,
    pub pixels_per_line: u32,
    pub lines_per_frame: u32,
    /// Seconds per line
    pub scan_line_period: f64,
}

impl LineScan {
    pub fn width_microns(&self) -> f64 {
        self.state.microns_per_pixel.x * self.pixels_per_line as f64
    }

    /// Seconds covered by one image.
    pub fn image_time(&self) -> f64 {
        self.scan_line_period * self.lines_per_frame as f64
    }
}

/// Photostimulation run. Only the start time is read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkPoints {
    pub xml_path: PathBuf,
    pub started: NaiveDateTime,
}

/// Single-point fluorescence recording. Only the start time is read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointScan {
    pub xml_path: PathBuf,
    pub started: NaiveDateTime,
}

/// A classified PrairieView acquisition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Scan {
    SingleImage(SingleImage),
    TSeries(TSeries),
    ZSeries(ZSeries),
    TZSeries(TZSeries),
    LineScan(LineScan),
    MarkPoints(MarkPoints),
    PointScan(PointScan),
}

impl Scan {
    pub fn kind(&self) -> ScanKind {
        match self {
            Scan::SingleImage(_) => ScanKind::SingleImage,
            Scan::TSeries(_) => ScanKind::TSeries,
            Scan::ZSeries(_) => ScanKind::ZSeries,
            Scan::TZSeries(_) => ScanKind::TZSeries,
            Scan::LineScan(_) => ScanKind::LineScan,
            Scan::MarkPoints(_) => ScanKind::MarkPoints,
            Scan::PointScan(_) => ScanKind::PointScan,
        }
    }

    /// Instrument configuration, for kinds that record it.
    pub fn state(&self) -> Option<&PvState> {
        match self {
            Scan::SingleImage(s) => Some(&s.state),
            Scan::TSeries(s) => Some(&s.state),
            Scan::ZSeries(s) => Some(&s.state),
            Scan::TZSeries(s) => Some(&s.state),
            Scan::LineScan(s) => Some(&s.state),
            Scan::MarkPoints(_) | Scan::PointScan(_) => None,
        }
    }

    pub fn started(&self) -> NaiveDateTime {
        match self {
            Scan::SingleImage(s) => s.state.started,
            Scan::TSeries(s) => s.state.started,
            Scan::ZSeries(s) => s.state.started,
            Scan::TZSeries(s) => s.state.started,
            Scan::LineScan(s) => s.state.started,
            Scan::MarkPoints(s) => s.started,
            Scan::PointScan(s) => s.started,
        }
    }

    pub fn xml_path(&self) -> &Path {
        match self {
            Scan::MarkPoints(s) => &s.xml_path,
            Scan::PointScan(s) => &s.xml_path,
            Scan::SingleImage(s) => &s.state.xml_path,
            Scan::TSeries(s) => &s.state.xml_path,
            Scan::ZSeries(s) => &s.state.xml_path,
            Scan::TZSeries(s) => &s.state.xml_path,
            Scan::LineScan(s) => &s.state.xml_path,
        }
    }

    /// Text report of the configuration and timing, one value per line.
    pub fn summary(&self) -> String {
        let mut out = match self.state() {
            Some(state) => state.summary(),
            None => format!(
                "Xml file path: {}\nScan started: {}\n",
                self.xml_path().display(),
                self.started()
            ),
        };

        let extra = match self {
            Scan::SingleImage(_) => Vec::new(),
            Scan::TSeries(s) => vec![
                format!("TSeries Image count: {}", s.frame_count()),
                format!(
                    "TSeries Image time: {} sec ({:.2} FPS)",
                    s.frame_period(),
                    1.0 / s.frame_period()
                ),
                format!(
                    "TSeries Total time: {} ({} min)",
                    s.total_time(),
                    round_to(s.total_time() / 60.0, 3)
                ),
            ],
            Scan::ZSeries(s) => vec![
                format!("ZSeries Image count: {}", s.frame_count()),
                format!("ZSeries Image time: {} sec", s.frame_period()),
                format!(
                    "ZSeries Total time: {} ({} min)",
                    s.total_time(),
                    round_to(s.total_time() / 60.0, 3)
                ),
            ],
            Scan::TZSeries(s) => vec![
                format!("TZSeries Stack count: {}", s.sequence_count()),
                format!("TZSeries Stack time: {}", s.stack_period()),
                format!(
                    "TZSeries Total time: {} ({} min)",
                    s.total_time(),
                    round_to(s.total_time() / 60.0, 3)
                ),
            ],
            Scan::LineScan(s) => vec![
                format!("LineScan sequences: {}", s.sequence_count),
                format!(
                    "LineScan space: {:.2} microns ({} pixels)",
                    s.width_microns(),
                    s.pixels_per_line
                ),
                format!(
                    "LineScan time per image: {:.2} seconds ({} pixels)",
                    s.image_time(),
                    s.lines_per_frame
                ),
                format!("LineScan time per line: {} ms", s.scan_line_period * 1000.0),
                format!(
                    "LineScan image size: {} x {}",
                    s.pixels_per_line, s.lines_per_frame
                ),
            ],
            Scan::MarkPoints(_) => vec!["MarkPoints stimulation".to_string()],
            Scan::PointScan(_) => vec!["Point scan recording".to_string()],
        };

        for line in extra {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

// =============================================================================
// ScanFactory
// =============================================================================

/// Builds [`Scan`] values from folders and XML files.
pub struct ScanFactory;

impl ScanFactory {
    /// Classify the acquisition in `folder`.
    ///
    /// `Ok(None)` means the folder holds no XML and therefore no scan.
    pub fn from_folder(folder: &Path) -> Result<Option<Scan>, ScanError> {
        match locate_scan_xml(folder)? {
            Some(xml_path) => Self::from_xml_path(&xml_path).map(Some),
            None => {
                debug!(folder = %folder.display(), "No scan XML in folder");
                Ok(None)
            }
        }
    }

    /// Read, classify and validate one scan XML.
    pub fn from_xml_path(xml_path: &Path) -> Result<Scan, ScanError> {
        let text = read_text(xml_path)?;
        let kind = ScanKind::detect(&text)?;
        let xml = PvXml::parse(&text, xml_path)?;
        let scan = Self::from_xml(kind, &xml)?;
        info!(
            kind = %kind,
            path = %xml_path.display(),
            "Loaded scan"
        );
        Ok(scan)
    }

    /// Build the variant for `kind` from a parsed document.
    pub fn from_xml(kind: ScanKind, xml: &PvXml) -> Result<Scan, ScanError> {
        let scan = match kind {
            ScanKind::SingleImage => {
                single_sequence(xml, kind)?;
                Scan::SingleImage(SingleImage {
                    state: PvState::from_xml(xml)?,
                })
            }
            ScanKind::TSeries => {
                let sequence = single_sequence(xml, kind)?;
                let frame_times = sequence
                    .frames
                    .iter()
                    .map(|f| f.relative_time.ok_or_else(|| missing_frame_time(xml, "relativeTime")))
                    .collect::<Result<Vec<_>, _>>()?;
                Scan::TSeries(TSeries {
                    state: PvState::from_xml(xml)?,
                    frame_times,
                })
            }
            ScanKind::ZSeries => {
                let sequence = single_sequence(xml, kind)?;
                let frame_times = sequence
                    .frames
                    .iter()
                    .map(|f| {
                        f.absolute_time
                            .map(|t| round_to(t, 6))
                            .ok_or_else(|| missing_frame_time(xml, "absoluteTime"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Scan::ZSeries(ZSeries {
                    state: PvState::from_xml(xml)?,
                    frame_times,
                })
            }
            ScanKind::TZSeries => {
                first_sequence(xml, kind, 2)?;
                Scan::TZSeries(TZSeries {
                    state: PvState::from_xml(xml)?,
                    sequence_times: sequence_times(xml)?,
                    frames_per_sequence: xml.sequences.iter().map(|s| s.frames.len()).collect(),
                })
            }
            ScanKind::LineScan => {
                let sequence = first_sequence(xml, kind, 1)?;
                let frame = sequence.frames.first().ok_or_else(|| {
                    ScanError::InvalidScan(format!(
                        "line scan sequence has no frames: {}",
                        xml.path.display()
                    ))
                })?;
                Scan::LineScan(LineScan {
                    state: PvState::from_xml(xml)?,
                    sequence_count: xml.sequences.len(),
                    pixels_per_line: frame.shard.parse("pixelsPerLine")?,
                    lines_per_frame: frame.shard.parse("linesPerFrame")?,
                    scan_line_period: frame.shard.parse("scanLinePeriod")?,
                })
            }
            ScanKind::MarkPoints => Scan::MarkPoints(MarkPoints {
                xml_path: xml.path.clone(),
                started: xml.started()?,
            }),
            ScanKind::PointScan => Scan::PointScan(PointScan {
                xml_path: xml.path.clone(),
                started: xml.started()?,
            }),
        };
        Ok(scan)
    }
}

/// Find the scan XML in an acquisition folder.
///
/// Prefers `<folder name>.xml`, then the first XML by name that is not a
/// MarkPoints pattern file, then any XML. `Ok(None)` when there is none.
pub fn locate_scan_xml(folder: &Path) -> Result<Option<PathBuf>, ScanError> {
    if !folder.is_dir() {
        return Err(ScanError::NotFound(folder.to_path_buf()));
    }

    if let Some(name) = folder.file_name() {
        let named = folder.join(format!("{}.xml", name.to_string_lossy()));
        if named.is_file() {
            return Ok(Some(named));
        }
    }

    let entries = std::fs::read_dir(folder)
        .map_err(|e| IoError::file(folder.display().to_string(), &e))?;
    let mut xml_files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("xml"))
                    .unwrap_or(false)
        })
        .collect();
    xml_files.sort();

    let is_pattern = |path: &PathBuf| {
        path.file_name()
            .map(|n| n.to_string_lossy().ends_with(MARK_POINTS_PATTERN_SUFFIX))
            .unwrap_or(false)
    };

    Ok(xml_files
        .iter()
        .find(|p| !is_pattern(p))
        .or_else(|| xml_files.first())
        .cloned())
}

// =============================================================================
// Validation and timing helpers
// =============================================================================

fn single_sequence(xml: &PvXml, kind: ScanKind) -> Result<&Sequence, ScanError> {
    if xml.sequences.len() != 1 {
        return Err(ScanError::InvalidScan(format!(
            "{} expects exactly 1 sequence, found {}: {}",
            kind,
            xml.sequences.len(),
            xml.path.display()
        )));
    }
    first_sequence(xml, kind, 1)
}

fn first_sequence(xml: &PvXml, kind: ScanKind, min_count: usize) -> Result<&Sequence, ScanError> {
    if xml.sequences.len() < min_count {
        return Err(ScanError::InvalidScan(format!(
            "{} expects at least {} sequences, found {}: {}",
            kind,
            min_count,
            xml.sequences.len(),
            xml.path.display()
        )));
    }
    let first = &xml.sequences[0];
    if first.kind != kind.sequence_type() {
        return Err(ScanError::InvalidScan(format!(
            "{} expects a \"{}\" sequence, found \"{}\": {}",
            kind,
            kind.sequence_type(),
            first.kind,
            xml.path.display()
        )));
    }
    Ok(first)
}

fn missing_frame_time(xml: &PvXml, attribute: &str) -> ScanError {
    ScanError::InvalidScan(format!(
        "frame without {}: {}",
        attribute,
        xml.path.display()
    ))
}

/// Seconds from the first sequence's start to each sequence's start.
fn sequence_times(xml: &PvXml) -> Result<Vec<f64>, ScanError> {
    let clock = xml
        .sequences
        .iter()
        .map(|s| {
            let time = s.time.as_deref().ok_or_else(|| {
                ScanError::InvalidScan(format!(
                    "sequence without time: {}",
                    xml.path.display()
                ))
            })?;
            parse_clock_seconds(time)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let start = clock.first().copied().unwrap_or(0.0);
    Ok(clock
        .iter()
        .map(|&t| {
            let elapsed = t - start;
            // acquisition ran past midnight
            if elapsed < 0.0 {
                elapsed + SECONDS_PER_DAY
            } else {
                elapsed
            }
        })
        .collect())
}

/// Seconds since midnight of a sequence `time` such as `13:40:30.1234567`.
///
/// Full timestamps are accepted as well; only their time of day is used.
fn parse_clock_seconds(value: &str) -> Result<f64, ScanError> {
    let value = value.trim();
    let time = NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", super::state::PV_DATE_FORMAT]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.time())
        })
        .ok_or_else(|| ScanError::InvalidValue {
            key: "time".to_string(),
            value: value.to_string(),
        })?;
    Ok(time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
