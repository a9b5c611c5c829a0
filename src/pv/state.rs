//! Instrument configuration recorded in PrairieView state shards.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use super::xml::PvXml;
use crate::error::ScanError;

/// PrairieView releases whose XML layout has been verified.
pub const SUPPORTED_VERSIONS: &[&str] = &["5.4.64.500", "5.5.64.500", "5.6.64.400"];

/// Format of the `PVScan` `date` attribute, e.g. `3/31/2022 1:40:30 PM`.
pub const PV_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

// =============================================================================
// StateShard
// =============================================================================

/// One `IndexedValue` (or `SubindexedValue`) under a state key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedValue {
    pub index: String,
    /// Set for values nested in `SubindexedValues`
    pub subindex: Option<String>,
    pub value: String,
    pub description: Option<String>,
}

/// One `PVStateValue` element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StateEntry {
    pub key: String,
    /// Flat value, when the element carries a `value` attribute
    pub value: Option<String>,
    pub indexed: Vec<IndexedValue>,
}

/// Key/value configuration block (`PVStateShard`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StateShard {
    pub entries: Vec<StateEntry>,
}

impl StateShard {
    fn entry(&self, key: &str) -> Option<&StateEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Flat value of `key`.
    pub fn value(&self, key: &str) -> Result<&str, ScanError> {
        self.entry(key)
            .and_then(|e| e.value.as_deref())
            .ok_or_else(|| ScanError::MissingKey(key.to_string()))
    }

    /// Indexed values of `key`; at least one must exist.
    pub fn indexed(&self, key: &str) -> Result<&[IndexedValue], ScanError> {
        match self.entry(key) {
            Some(e) if !e.indexed.is_empty() => Ok(&e.indexed),
            _ => Err(ScanError::MissingKey(key.to_string())),
        }
    }

    /// Flat value of `key` parsed as `T`.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<T, ScanError> {
        parse_value(key, self.value(key)?)
    }
}

/// Parse a configuration string, reporting the key on failure.
pub(crate) fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ScanError> {
    value.trim().parse().map_err(|_| ScanError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Enumerated settings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanMode {
    GalvoGalvo,
    ResonantGalvo,
}

impl ScanMode {
    fn from_active_mode(value: &str) -> Result<Self, ScanError> {
        match value {
            "Galvo" => Ok(ScanMode::GalvoGalvo),
            "ResonantGalvo" => Ok(ScanMode::ResonantGalvo),
            other => Err(ScanError::UnsupportedValue {
                key: "activeMode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::GalvoGalvo => write!(f, "Galvo-Galvo"),
            ScanMode::ResonantGalvo => write!(f, "Resonant-Galvo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZDevice {
    Motor,
    Piezo,
    Unknown,
}

impl From<i64> for ZDevice {
    fn from(index: i64) -> Self {
        match index {
            0 => ZDevice::Motor,
            1 => ZDevice::Piezo,
            _ => ZDevice::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Laser {
    pub index: u32,
    pub name: String,
    pub power: f64,
}

impl Laser {
    pub fn is_on(&self) -> bool {
        self.power > 0.0
    }
}

impl fmt::Display for Laser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_on() {
            write!(f, "Laser {}: {} (ON, Power={})", self.index, self.name, self.power)
        } else {
            write!(f, "Laser {}: {} (Off)", self.index, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MicronsPerPixel {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// =============================================================================
// PvState
// =============================================================================

/// Hardware configuration of one acquisition, independent of scan type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvState {
    pub xml_path: PathBuf,
    pub version: String,
    pub started: NaiveDateTime,
    pub scan_mode: ScanMode,
    pub bit_depth: u32,
    /// Pixel dwell time in microseconds
    pub dwell_time: f64,
    /// Seconds per frame
    pub frame_period: f64,
    pub lasers: Vec<Laser>,
    pub microns_per_pixel: MicronsPerPixel,
    pub optical_zoom: f64,
    pub pmt_gains: Vec<f64>,
    /// Frame averaging
    pub rasters_per_frame: u32,
    pub z_device: ZDevice,
}

impl PvState {
    /// Read the configuration from the document's root shard.
    ///
    /// Unknown PrairieView versions are accepted with a warning.
    pub fn from_xml(xml: &PvXml) -> Result<Self, ScanError> {
        if !SUPPORTED_VERSIONS.contains(&xml.version.as_str()) {
            warn!(
                version = %xml.version,
                path = %xml.path.display(),
                "Untested PrairieView version"
            );
        }

        let shard = &xml.shard;

        let lasers = shard
            .indexed("laserPower")?
            .iter()
            .map(|v| {
                Ok(Laser {
                    index: parse_value("laserPower", &v.index)?,
                    name: v.description.clone().unwrap_or_default(),
                    power: parse_value("laserPower", &v.value)?,
                })
            })
            .collect::<Result<Vec<_>, ScanError>>()?;

        let mut microns_per_pixel = MicronsPerPixel {
            x: f64::NAN,
            y: f64::NAN,
            z: f64::NAN,
        };
        for v in shard.indexed("micronsPerPixel")? {
            let axis = match v.index.as_str() {
                "XAxis" => &mut microns_per_pixel.x,
                "YAxis" => &mut microns_per_pixel.y,
                "ZAxis" => &mut microns_per_pixel.z,
                _ => continue,
            };
            *axis = parse_value("micronsPerPixel", &v.value)?;
        }

        let pmt_gains = shard
            .indexed("pmtGain")?
            .iter()
            .map(|v| parse_value("pmtGain", &v.value))
            .collect::<Result<Vec<f64>, ScanError>>()?;

        Ok(PvState {
            xml_path: xml.path.clone(),
            version: xml.version.clone(),
            started: xml.started()?,
            scan_mode: ScanMode::from_active_mode(shard.value("activeMode")?)?,
            bit_depth: shard.parse("bitDepth")?,
            dwell_time: shard.parse("dwellTime")?,
            frame_period: shard.parse("framePeriod")?,
            lasers,
            microns_per_pixel,
            optical_zoom: shard.parse("opticalZoom")?,
            pmt_gains,
            rasters_per_frame: shard.parse("rastersPerFrame")?,
            z_device: ZDevice::from(shard.parse::<i64>("zDevice")?),
        })
    }

    /// Human-readable configuration report, one setting per line.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Xml file path: {}", self.xml_path.display()),
            format!("Prairie View version: {}", self.version),
            format!("Scan started: {}", self.started),
            format!("Scan mode: {}", self.scan_mode),
            format!("Bit depth: {}", self.bit_depth),
            format!("Dwell time: {}", self.dwell_time),
            format!("Frame period: {}", self.frame_period),
        ];
        lines.extend(self.lasers.iter().map(Laser::to_string));
        lines.push(format!("Microns per pixel X: {}", self.microns_per_pixel.x));
        lines.push(format!("Microns per pixel Y: {}", self.microns_per_pixel.y));
        lines.push(format!("Microns per pixel Z: {}", self.microns_per_pixel.z));
        lines.push(format!("Optical zoom: {}", self.optical_zoom));
        for (i, gain) in self.pmt_gains.iter().enumerate() {
            lines.push(format!("PMT{} gain: {}", i + 1, gain));
        }
        lines.push(format!("Frame averaging: {}", self.rasters_per_frame));
        lines.push(format!("Z device: {:?}", self.z_device));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}
