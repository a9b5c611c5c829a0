//! Scan metadata integration tests.
//!
//! Tests verify:
//! - Acquisition folders are classified by their XML
//! - Timing and configuration values reach the typed scans
//! - Unsupported or malformed documents fail with descriptive errors

use pvtools::pv::{locate_scan_xml, ScanMode, ZDevice};
use pvtools::{Scan, ScanError, ScanFactory, ScanKind};

use super::test_utils::{
    linescan_xml, pv_document, tseries_xml, tzseries_xml, unknown_scan_xml, write_scan_xml,
    zseries_xml,
};

const DATE: &str = "3/31/2022 1:40:30 PM";

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_tseries_folder() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("TSeries-001");
    write_scan_xml(&folder, &tseries_xml("TSeries-001", DATE, 4));

    let scan = ScanFactory::from_folder(&folder).unwrap().unwrap();
    assert_eq!(scan.kind(), ScanKind::TSeries);
    assert_eq!(scan.started().to_string(), "2022-03-31 13:40:30");

    let Scan::TSeries(series) = &scan else {
        panic!("expected a T-series, got {:?}", scan.kind());
    };
    assert_eq!(series.frame_times, vec![0.0, 0.5, 1.0, 1.5]);
    assert_eq!(series.frame_period(), 0.5);
    assert_eq!(series.total_time(), 2.0);

    let state = &series.state;
    assert_eq!(state.scan_mode, ScanMode::GalvoGalvo);
    assert_eq!(state.bit_depth, 13);
    assert_eq!(state.z_device, ZDevice::Motor);
    assert_eq!(state.pmt_gains, vec![700.0, 650.0]);
    assert!(state.lasers[0].is_on());
    assert!(!state.lasers[1].is_on());
}

#[test]
fn test_zseries_times_are_absolute() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("ZSeries-001");
    write_scan_xml(&folder, &zseries_xml("ZSeries-001", DATE, 3));

    let scan = ScanFactory::from_folder(&folder).unwrap().unwrap();
    let Scan::ZSeries(series) = scan else {
        panic!("expected a Z-series");
    };
    assert_eq!(series.frame_times, vec![2.0, 2.25, 2.5]);
    assert_eq!(series.frame_period(), 0.25);
}

#[test]
fn test_tzseries_across_midnight() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("TSeries-002");
    write_scan_xml(
        &folder,
        &tzseries_xml(DATE, &["23:59:50.0", "00:00:10.0", "00:00:30.0"], 5),
    );

    let scan = ScanFactory::from_folder(&folder).unwrap().unwrap();
    let Scan::TZSeries(series) = scan else {
        panic!("expected a TZ-series");
    };
    assert_eq!(series.sequence_times, vec![0.0, 20.0, 40.0]);
    assert_eq!(series.frames_per_sequence, vec![5, 5, 5]);
    assert_eq!(series.stack_period(), 20.0);
}

#[test]
fn test_linescan_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("LineScan-001");
    write_scan_xml(&folder, &linescan_xml("LineScan-001", DATE));

    let scan = ScanFactory::from_folder(&folder).unwrap().unwrap();
    let Scan::LineScan(line) = &scan else {
        panic!("expected a line scan");
    };
    assert_eq!(line.pixels_per_line, 64);
    assert_eq!(line.lines_per_frame, 3);
    assert_eq!(line.width_microns(), 16.0);
    assert!(scan.summary().contains("LineScan image size: 64 x 3"));
}

#[test]
fn test_folder_without_xml() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ScanFactory::from_folder(dir.path()).unwrap().is_none());
}

#[test]
fn test_missing_folder() {
    let dir = tempfile::tempdir().unwrap();
    let result = ScanFactory::from_folder(&dir.path().join("absent"));
    assert!(matches!(result, Err(ScanError::NotFound(_))));
}

// =============================================================================
// XML selection
// =============================================================================

#[test]
fn test_prefers_folder_named_xml() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("SingleImage-001");
    let named = write_scan_xml(&folder, "<PVScan/>");
    std::fs::write(folder.join("Aaa.xml"), "<PVScan/>").unwrap();

    assert_eq!(locate_scan_xml(&folder).unwrap(), Some(named));
}

#[test]
fn test_skips_markpoints_pattern_file() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("renamed");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("A_MarkPoints.xml"), "").unwrap();
    std::fs::write(folder.join("B.xml"), "").unwrap();

    assert_eq!(locate_scan_xml(&folder).unwrap(), Some(folder.join("B.xml")));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_unknown_sequence_type() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("Spiral-001");
    write_scan_xml(&folder, &unknown_scan_xml(DATE));

    match ScanFactory::from_folder(&folder) {
        Err(ScanError::UnsupportedScanType(root)) => {
            assert!(root.starts_with("<PVScan"));
            assert!(root.contains("5.5.64.500"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_malformed_xml() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("TSeries-003");
    write_scan_xml(
        &folder,
        r#"<PVScan version="5.5.64.500"><Sequence type="TSeries Timed Element">"#,
    );

    assert!(matches!(
        ScanFactory::from_folder(&folder),
        Err(ScanError::Xml { .. })
    ));
}

#[test]
fn test_missing_state_key() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("SingleImage-002");
    let xml = pv_document(DATE, r#"  <Sequence type="Single" cycle="1" />"#)
        .replace(r#"<PVStateValue key="bitDepth" value="13" />"#, "");
    write_scan_xml(&folder, &xml);

    match ScanFactory::from_folder(&folder) {
        Err(ScanError::MissingKey(key)) => assert_eq!(key, "bitDepth"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_wrong_sequence_count() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("SingleImage-003");
    write_scan_xml(
        &folder,
        &pv_document(
            DATE,
            r#"  <Sequence type="Single" cycle="1" />
  <Sequence type="Single" cycle="2" />"#,
        ),
    );

    assert!(matches!(
        ScanFactory::from_folder(&folder),
        Err(ScanError::InvalidScan(_))
    ));
}

#[test]
fn test_json_carries_scan_type() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("TSeries-004");
    write_scan_xml(&folder, &tseries_xml("TSeries-004", DATE, 2));

    let scan = ScanFactory::from_folder(&folder).unwrap().unwrap();
    let json = serde_json::to_value(&scan).unwrap();
    assert_eq!(json["type"], "TSeries");
    assert_eq!(json["frame_times"][1], 0.5);
    assert_eq!(json["state"]["version"], "5.5.64.500");
}
