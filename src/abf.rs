//! Axon Binary Format (ABF) recording start times.
//!
//! Only the fixed header fields that locate a recording in time are read;
//! sweep data is never touched.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::error::{AbfError, IoError};
use crate::io::{read_u32_le, FileRangeReader, RangeReader};

/// Bytes needed to reach the last date field of either header version.
const HEADER_PREFIX_LEN: usize = 28;

/// Dates outside this range are treated as corrupt headers.
const VALID_YEARS: std::ops::Range<i32> = 1980..2080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbfVersion {
    /// Signature `ABF `
    Abf1,
    /// Signature `ABF2`
    Abf2,
}

/// Start timestamp of one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbfHeader {
    pub path: PathBuf,
    pub version: AbfVersion,
    pub started: NaiveDateTime,
}

impl AbfHeader {
    /// Read the header of an ABF file.
    pub fn read(path: &Path) -> Result<Self, AbfError> {
        let reader = FileRangeReader::open(path)?;
        let len = HEADER_PREFIX_LEN.min(reader.size() as usize);
        let bytes = reader.read_exact_at(0, len)?;
        let (version, started) = Self::parse(&bytes)?;

        debug!(
            path = %path.display(),
            version = ?version,
            started = %started,
            "Read ABF header"
        );
        Ok(AbfHeader {
            path: path.to_path_buf(),
            version,
            started,
        })
    }

    /// Decode the signature and start time from the first header bytes.
    pub fn parse(bytes: &[u8]) -> Result<(AbfVersion, NaiveDateTime), AbfError> {
        if bytes.len() < HEADER_PREFIX_LEN {
            return Err(AbfError::Io(IoError::RangeOutOfBounds {
                offset: 0,
                requested: HEADER_PREFIX_LEN as u64,
                size: bytes.len() as u64,
            }));
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&bytes[..4]);

        match &signature {
            b"ABF2" => {
                let date = read_u32_le(&bytes[16..20]);
                let millis = read_u32_le(&bytes[20..24]);
                let started = date_from_code(date)?
                    .and_hms_opt(0, 0, 0)
                    .ok_or(AbfError::InvalidDate(date))?
                    + Duration::milliseconds(i64::from(millis));
                Ok((AbfVersion::Abf2, started))
            }
            b"ABF " => {
                let date = read_u32_le(&bytes[20..24]) as i32;
                let seconds = read_u32_le(&bytes[24..28]) as i32;
                if date < 0 {
                    return Err(AbfError::InvalidDate(date as u32));
                }
                let started = date_from_code(date as u32)?
                    .and_hms_opt(0, 0, 0)
                    .ok_or(AbfError::InvalidDate(date as u32))?
                    + Duration::seconds(i64::from(seconds));
                Ok((AbfVersion::Abf1, started))
            }
            _ => Err(AbfError::UnknownSignature(signature)),
        }
    }
}

/// Decode a `YYYYMMDD` date code.
fn date_from_code(code: u32) -> Result<NaiveDate, AbfError> {
    let year = (code / 10_000) as i32;
    let month = (code / 100) % 100;
    let day = code % 100;

    if !VALID_YEARS.contains(&year) {
        return Err(AbfError::InvalidDate(code));
    }
    NaiveDate::from_ymd_opt(year, month, day).ok_or(AbfError::InvalidDate(code))
}

/// ABF files directly inside `folder`, sorted by name.
///
/// A missing folder yields an empty list.
pub fn find_abfs(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        debug!(folder = %folder.display(), "ABF folder not found");
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("abf"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}
