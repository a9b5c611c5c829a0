//! PrairieView scan metadata.
//!
//! A PrairieView acquisition folder holds the image files plus one XML
//! document describing the scan. This module parses that document
//! ([`PvXml`]), extracts the instrument configuration ([`PvState`]) and
//! classifies the folder into one [`Scan`] variant.
//!
//! ```no_run
//! use pvtools::pv::ScanFactory;
//! use std::path::Path;
//!
//! if let Some(scan) = ScanFactory::from_folder(Path::new("TSeries-001"))? {
//!     print!("{}", scan.summary());
//! }
//! # Ok::<(), pvtools::ScanError>(())
//! ```

mod scan;
mod state;
mod xml;

pub use scan::{
    locate_scan_xml, LineScan, MarkPoints, PointScan, Scan, ScanFactory, ScanKind, SingleImage,
    TSeries, TZSeries, ZSeries,
};
pub use state::{
    IndexedValue, Laser, MicronsPerPixel, PvState, ScanMode, StateEntry, StateShard, ZDevice,
    PV_DATE_FORMAT, SUPPORTED_VERSIONS,
};
pub use xml::{parse_pv_date, Frame, FrameFile, PvXml, Sequence};
