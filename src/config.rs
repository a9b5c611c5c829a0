//! Command-line configuration for pvtools.
//!
//! Every option can also be set through an environment variable with the
//! `PVTOOLS_` prefix:
//!
//! - `PVTOOLS_LOW_PERCENTILE` - Lower contrast percentile (default: 0.05)
//! - `PVTOOLS_HIGH_PERCENTILE` - Upper contrast percentile (default: 99.95)
//! - `PVTOOLS_DIVISOR` - Projection divisor (default: 16)
//! - `PVTOOLS_CHANNELS` - Projected channels (default: 1,2)
//! - `PVTOOLS_TEMPLATES` - Folder of report HTML templates
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pvtools::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Convert(config) = cli.command {
//!     config.validate()?;
//! }
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::image::{ConvertOptions, DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE};

// =============================================================================
// Default Values
// =============================================================================

/// Default divisor applied to 16-bit projections before 8-bit packing.
pub const DEFAULT_DIVISOR: f64 = 16.0;

/// Channels projected when none are given.
pub const DEFAULT_CHANNELS: [u8; 2] = [1, 2];

/// Prefix of the acquisition folders `project` walks.
pub const ZSERIES_PREFIX: &str = "ZSeries-";

// =============================================================================
// CLI Arguments
// =============================================================================

/// pvtools - two-photon imaging utilities for PrairieView acquisitions.
#[derive(Parser, Debug, Clone)]
#[command(name = "pvtools")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert a TIFF file, or a folder of TIFFs, to 8-bit PNG/BMP.
    Convert(ConvertConfig),

    /// Maximum-intensity projection of every ZSeries folder.
    Project(ProjectConfig),

    /// Print TIFF header details or a scan folder summary.
    Info(InfoConfig),

    /// Analyze acquisition folders and write their HTML timeline.
    Report(ReportConfig),
}

// =============================================================================
// Convert
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// TIFF file or folder of TIFF files.
    pub input: PathBuf,

    /// Output image file, or an existing folder when `input` is a folder.
    pub output: PathBuf,

    /// Clamp samples as-is instead of stretching between percentiles.
    #[arg(long, default_value_t = false)]
    pub no_autoscale: bool,

    /// Lower percentile mapped to 0.
    #[arg(long, default_value_t = DEFAULT_LOW_PERCENTILE, env = "PVTOOLS_LOW_PERCENTILE")]
    pub low: f64,

    /// Upper percentile mapped to 255.
    #[arg(long, default_value_t = DEFAULT_HIGH_PERCENTILE, env = "PVTOOLS_HIGH_PERCENTILE")]
    pub high: f64,
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_percentiles(self.low, self.high)
    }

    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            autoscale: !self.no_autoscale,
            low_percentile: self.low,
            high_percentile: self.high,
        }
    }
}

// =============================================================================
// Project
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ProjectConfig {
    /// Folder holding `ZSeries-*` acquisition folders.
    pub folder: PathBuf,

    /// Divide projected samples by this before saving.
    #[arg(long, default_value_t = DEFAULT_DIVISOR, env = "PVTOOLS_DIVISOR")]
    pub divisor: f64,

    /// Channels to project (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CHANNELS, env = "PVTOOLS_CHANNELS")]
    pub channels: Vec<u8>,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.divisor.is_finite() || self.divisor <= 0.0 {
            return Err(format!("divisor must be a positive number, got {}", self.divisor));
        }
        if self.channels.is_empty() {
            return Err("at least one channel is required".to_string());
        }
        if self.channels.contains(&0) {
            return Err("channels are numbered from 1".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Info
// =============================================================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// TIFF file or scan folder.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = InfoFormat::Text)]
    pub format: InfoFormat,
}

// =============================================================================
// Report
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ReportConfig {
    /// Folders of scan folders, one report each.
    #[arg(required = true)]
    pub folders: Vec<PathBuf>,

    /// Regenerate analysis files that already exist.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Folder with `base.html`, `header.html` and `timeline-item-details.html`
    /// replacing the built-in templates.
    #[arg(long, env = "PVTOOLS_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(missing) = self.folders.iter().find(|f| !f.is_dir()) {
            return Err(format!("report folder not found: {}", missing.display()));
        }
        Ok(())
    }
}

fn validate_percentiles(low: f64, high: f64) -> Result<(), String> {
    let in_range = |p: f64| (0.0..=100.0).contains(&p);
    if !in_range(low) || !in_range(high) {
        return Err(format!(
            "percentiles must be between 0 and 100, got {} and {}",
            low, high
        ));
    }
    if low >= high {
        return Err(format!(
            "low percentile ({}) must be below high percentile ({})",
            low, high
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
