//! Point-scan recordings exported as `time,ch1,ch2` CSV text.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::dat::write_xrg;
use crate::error::ReportError;

/// Samples of one point-scan recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointScanTrace {
    /// Milliseconds since the recording started
    pub times: Vec<f64>,
    pub ch1: Vec<f64>,
    pub ch2: Vec<f64>,
}

impl PointScanTrace {
    /// Parse CSV text. Lines that do not hold three numbers (headers,
    /// blank lines) are skipped.
    pub fn parse(text: &str) -> Self {
        let mut trace = PointScanTrace::default();
        for line in text.lines() {
            let mut parts = line.split(',').map(|p| p.trim().parse::<f64>());
            let fields = (parts.next(), parts.next(), parts.next());
            if let (Some(Ok(t)), Some(Ok(a)), Some(Ok(b))) = fields {
                trace.times.push(t);
                trace.ch1.push(a);
                trace.ch2.push(b);
            }
        }
        trace
    }

    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let trace = Self::parse(&text);
        debug!(path = %path.display(), samples = trace.len(), "Read point scan CSV");
        Ok(trace)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Write both channels as an Origin time course.
    pub fn write_dat(&self, path: &Path) -> Result<bool, ReportError> {
        write_xrg(&self.times, &self.ch1, &self.ch2, path, "ms")
    }
}

/// CSV files directly inside `folder`, sorted by name.
pub fn csv_files(folder: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let entries = std::fs::read_dir(folder).map_err(|e| ReportError::io(folder, e))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}
