//! Tab-separated `.dat` files for OriginLab.
//!
//! Origin reads the first three rows of a column as long name, units and
//! comment, then numeric data.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReportError;

/// Header rows of a two-column file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatLabels {
    pub x_label: String,
    pub y_label: String,
    pub x_unit: String,
    pub y_unit: String,
    pub x_comment: String,
    pub y_comment: String,
}

impl DatLabels {
    pub fn new(x_label: &str, x_unit: &str, y_label: &str, y_unit: &str) -> Self {
        Self {
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_unit: x_unit.to_string(),
            y_unit: y_unit.to_string(),
            ..Self::default()
        }
    }
}

/// Write a time course of both imaging channels.
///
/// Channels shorter than `xs` are padded with 0. With fewer than two x
/// values nothing is written and `Ok(false)` is returned.
pub fn write_xrg(
    xs: &[f64],
    red: &[f64],
    green: &[f64],
    path: &Path,
    x_unit: &str,
) -> Result<bool, ReportError> {
    if xs.len() < 2 {
        debug!(path = %path.display(), points = xs.len(), "Too few points for DAT file");
        return Ok(false);
    }

    let mut out = String::new();
    out.push_str("Time\tRed\tGreen\n");
    let _ = writeln!(out, "{}\tAFU\tAFU", x_unit);
    out.push_str("X\timage mean\timage mean\n");
    for (i, x) in xs.iter().enumerate() {
        let r = red.get(i).copied().unwrap_or(0.0);
        let g = green.get(i).copied().unwrap_or(0.0);
        let _ = writeln!(out, "{}\t{}\t{}", x, r, g);
    }

    write(path, &out)?;
    Ok(true)
}

/// Write paired x/y values. Extra values in the longer slice are ignored.
pub fn write_xy(xs: &[f64], ys: &[f64], path: &Path, labels: &DatLabels) -> Result<(), ReportError> {
    let mut out = String::new();
    let _ = writeln!(out, "{}\t{}", labels.x_label, labels.y_label);
    let _ = writeln!(out, "{}\t{}", labels.x_unit, labels.y_unit);
    let _ = writeln!(out, "{}\t{}", labels.x_comment, labels.y_comment);
    for (x, y) in xs.iter().zip(ys) {
        let _ = writeln!(out, "{}\t{}", x, y);
    }
    write(path, &out)
}

/// Write y values against their index.
pub fn write_y(ys: &[f64], path: &Path, labels: &DatLabels) -> Result<(), ReportError> {
    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
    write_xy(&xs, ys, path, labels)
}

/// Write several series as columns of one matrix.
///
/// Row `i` holds every sample of series `i`, led by the row index. Shorter
/// series are padded with 0. A transposed copy with one row per sample is
/// written next to it as `<path>-rotated.dat`. Returns both paths.
pub fn write_columns(columns: &[Vec<f64>], path: &Path) -> Result<(PathBuf, PathBuf), ReportError> {
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    let cell = |series: usize, sample: usize| columns[series].get(sample).copied().unwrap_or(0.0);

    let by_sample = matrix_tsv(rows, columns.len(), |row, col| cell(col, row));
    let by_series = matrix_tsv(columns.len(), rows, |row, col| cell(row, col));

    let mut rotated = path.as_os_str().to_owned();
    rotated.push("-rotated.dat");
    let rotated = PathBuf::from(rotated);

    write(path, &by_series)?;
    write(&rotated, &by_sample)?;
    Ok((path.to_path_buf(), rotated))
}

fn matrix_tsv(rows: usize, cols: usize, value: impl Fn(usize, usize) -> f64) -> String {
    let mut out = String::new();
    for row in 0..rows {
        let _ = write!(out, "{}", row);
        for col in 0..cols {
            let _ = write!(out, "\t{}", value(row, col));
        }
        out.push('\n');
    }
    out
}

fn write(path: &Path, contents: &str) -> Result<(), ReportError> {
    std::fs::write(path, contents).map_err(|e| ReportError::io(path, e))?;
    debug!(path = %path.display(), bytes = contents.len(), "Wrote DAT file");
    Ok(())
}
