//! Automatic analysis of acquisition folders and the HTML timeline report.
//!
//! [`analyze_all`] walks the scan subfolders of an experiment day and writes
//! derived images and `.dat` files into each one's `autoanalysis/` folder.
//! [`build_index`] then places every scan and ABF recording on a timeline
//! page rendered from [`Templates`].

mod batch;
mod builder;
mod dat;
mod experiment;
mod pointscan;
mod templates;
mod timeline;

pub use batch::{analyze_all, build_index, run, ABF_FOLDER, INDEX_FILE, REPORT_TITLE};
pub use builder::ReportBuilder;
pub use dat::{write_columns, write_xrg, write_xy, write_y, DatLabels};
pub use experiment::{Experiment, ResultsFiles, AUTOANALYSIS_DIR, REFERENCES_DIR};
pub use pointscan::{csv_files, PointScanTrace};
pub use templates::{fill, html_escape, Templates, BASE_FILE, HEADER_FILE, TIMELINE_ITEM_FILE};
pub use timeline::{Timeline, TimelineEntry, TimelineIcon, TimelineItem, SPACER_GAP_MINUTES};
