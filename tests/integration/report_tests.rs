//! Report integration tests.
//!
//! Tests verify:
//! - Each scan kind writes its analysis files into `autoanalysis/`
//! - Existing outputs are kept unless overwriting is requested
//! - Unreadable folders are skipped without aborting the run
//! - The index page places scans and ABF recordings on one timeline

use std::path::{Path, PathBuf};

use pvtools::report::{self, Templates, AUTOANALYSIS_DIR};
use pvtools::{analyze_all, build_index, Experiment, ReportError};

use super::test_utils::{
    create_abf2, is_png, linescan_xml, pointscan_xml, tseries_xml, tzseries_xml,
    unknown_scan_xml, write_channel_frames, write_scan_xml, zseries_xml, StripTiffBuilder,
};

/// A day of experiments:
///
/// ```text
/// root/
///   abfs/22331001.abf        13:45:00
///   slices/
///     TSeries-001/           13:40:30, 3 frames, References/Window1.tif
///     ZSeries-001/           13:50:00, 2 planes
///     LineScan-001/          15:02:10
///     Spiral-001/            unsupported sequence type
///     notes/                 no XML
/// ```
fn experiment_day(root: &Path) -> PathBuf {
    let slices = root.join("slices");

    let tseries = slices.join("TSeries-001");
    write_scan_xml(&tseries, &tseries_xml("TSeries-001", "3/31/2022 1:40:30 PM", 3));
    write_channel_frames(&tseries, "TSeries-001", 3, 4, 4, |ch, frame| {
        if ch == 1 {
            100 * frame as u16
        } else {
            10 * frame as u16
        }
    });
    let window: Vec<u8> = (0..16).map(|v| v * 10).collect();
    StripTiffBuilder::gray8(4, 4, &window).write_to(&tseries.join("References/Window1.tif"));
    StripTiffBuilder::gray8(4, 4, &window).write_to(&tseries.join("References/Other.tif"));

    let zseries = slices.join("ZSeries-001");
    write_scan_xml(&zseries, &zseries_xml("ZSeries-001", "3/31/2022 1:50:00 PM", 2));
    write_channel_frames(&zseries, "ZSeries-001", 2, 4, 4, |ch, frame| {
        (ch as u16) * 1000 + frame as u16
    });

    let linescan = slices.join("LineScan-001");
    write_scan_xml(&linescan, &linescan_xml("LineScan-001", "3/31/2022 3:02:10 PM"));
    write_channel_frames(&linescan, "LineScan-001", 1, 4, 3, |ch, _| 500 * ch as u16);

    write_scan_xml(&slices.join("Spiral-001"), &unknown_scan_xml("3/31/2022 2:00:00 PM"));
    std::fs::create_dir_all(slices.join("notes")).unwrap();

    let abfs = root.join("abfs");
    std::fs::create_dir_all(&abfs).unwrap();
    let start_ms = (13 * 3600 + 45 * 60) * 1000;
    std::fs::write(abfs.join("22331001.abf"), create_abf2(20220331, start_ms)).unwrap();

    slices
}

fn output(slices: &Path, scan: &str, file: &str) -> PathBuf {
    slices.join(scan).join(AUTOANALYSIS_DIR).join(file)
}

// =============================================================================
// Analysis
// =============================================================================

#[test]
fn test_analyze_all_skips_unusable_folders() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());

    let experiments = analyze_all(&slices, false).unwrap();
    let names: Vec<String> = experiments.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["LineScan-001", "TSeries-001", "ZSeries-001"]);
    assert!(!slices.join("Spiral-001").join(AUTOANALYSIS_DIR).exists());
}

#[test]
fn test_tseries_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    let reference = output(&slices, "TSeries-001", "ref_Window1.png");
    assert!(is_png(&std::fs::read(&reference).unwrap()));
    assert!(!output(&slices, "TSeries-001", "ref_Other.png").exists());

    let dat = std::fs::read_to_string(output(&slices, "TSeries-001", "intensity.dat")).unwrap();
    let lines: Vec<&str> = dat.lines().collect();
    assert_eq!(lines[0], "Time\tRed\tGreen");
    assert_eq!(lines[1], "sec\tAFU\tAFU");
    assert_eq!(&lines[3..], &["0\t100\t10", "0.5\t200\t20", "1\t300\t30"]);
}

#[test]
fn test_zseries_projections() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    for file in ["proj_red.png", "proj_green.png"] {
        let path = output(&slices, "ZSeries-001", file);
        assert!(is_png(&std::fs::read(&path).unwrap()), "{} missing", file);
    }
}

#[test]
fn test_linescan_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    assert!(output(&slices, "LineScan-001", "data_ch2_LineScan-001_Cycle00001_Ch2_000001.png")
        .is_file());

    let dat =
        std::fs::read_to_string(output(&slices, "LineScan-001", "linescan_ch2.dat")).unwrap();
    let rows: Vec<&str> = dat.lines().skip(3).collect();
    // 2 ms per line, every row averages to the channel's fill value
    assert_eq!(rows, vec!["0\t1000", "2\t1000", "4\t1000"]);
}

#[test]
fn test_tzseries_depth_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("TSeries-002");
    write_scan_xml(
        &folder,
        &tzseries_xml("3/31/2022 1:40:30 PM", &["13:40:30.0", "13:41:00.0"], 3),
    );
    for cycle in 1..=2u16 {
        for channel in 1..=2u16 {
            for plane in 1..=3u16 {
                let value = channel * 100 + cycle * 10 + plane;
                let name = format!(
                    "TSeries-002_Cycle{:05}_Ch{}_{:06}.ome.tif",
                    cycle, channel, plane
                );
                StripTiffBuilder::gray16(2, 2, &[value; 4]).write_to(&folder.join(name));
            }
        }
    }
    let reference: Vec<u8> = (0..4).map(|v| v * 50).collect();
    StripTiffBuilder::gray8(2, 2, &reference).write_to(&folder.join("References/Reference.tif"));

    let experiment = Experiment::open(&folder).unwrap();
    let written = experiment.analyze(false).unwrap();
    assert_eq!(written.len(), 5);
    assert!(is_png(
        &std::fs::read(output(dir.path(), "TSeries-002", "ref_Reference.png")).unwrap()
    ));

    // one row per cycle, one column per depth
    let main =
        std::fs::read_to_string(output(dir.path(), "TSeries-002", "intensity_ch1.dat")).unwrap();
    assert_eq!(main, "0\t111\t112\t113\n1\t121\t122\t123\n");

    let rotated = std::fs::read_to_string(output(
        dir.path(),
        "TSeries-002",
        "intensity_ch2.dat-rotated.dat",
    ))
    .unwrap();
    assert_eq!(rotated, "0\t211\t221\n1\t212\t222\n2\t213\t223\n");
}

#[test]
fn test_pointscan_traces() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("PointScan-001");
    write_scan_xml(&folder, &pointscan_xml("3/31/2022 2:10:00 PM"));
    std::fs::write(
        folder.join("trace.csv"),
        "Time(ms),Ch1,Ch2\n0,1.5,2\n0.5,3,4\n1,5,6\n",
    )
    .unwrap();
    std::fs::write(folder.join("short.csv"), "Time(ms),Ch1,Ch2\n0,1,1\n").unwrap();

    let experiment = Experiment::open(&folder).unwrap();
    let written = experiment.analyze(false).unwrap();
    assert_eq!(
        written,
        vec![output(dir.path(), "PointScan-001", "pointscan_trace.dat")]
    );

    let dat = std::fs::read_to_string(&written[0]).unwrap();
    let lines: Vec<&str> = dat.lines().collect();
    assert_eq!(lines[1], "ms\tAFU\tAFU");
    assert_eq!(&lines[3..], &["0\t1.5\t2", "0.5\t3\t4", "1\t5\t6"]);
    assert!(!output(dir.path(), "PointScan-001", "pointscan_short.dat").exists());
}

#[test]
fn test_existing_outputs_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    let experiment = Experiment::open(&slices.join("TSeries-001")).unwrap();
    assert!(experiment.analyze(false).unwrap().is_empty());

    let rewritten = experiment.analyze(true).unwrap();
    assert!(rewritten.contains(&output(&slices, "TSeries-001", "intensity.dat")));
}

#[test]
fn test_results_files_grouped() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    let experiment = Experiment::open(&slices.join("TSeries-001")).unwrap();
    let groups = experiment.results_files().unwrap();
    let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, vec!["Reference Images", "OriginLab Files"]);
    assert_eq!(
        groups[0].paths,
        vec!["TSeries-001/autoanalysis/ref_Window1.png".to_string()]
    );
}

#[test]
fn test_open_classifies_folders() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());

    assert!(matches!(
        Experiment::open(&slices.join("notes")),
        Err(ReportError::NotAScan(_))
    ));
    assert!(matches!(
        Experiment::open(&slices.join("Spiral-001")),
        Err(ReportError::Scan(_))
    ));
}

// =============================================================================
// Index page
// =============================================================================

#[test]
fn test_build_index_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());
    analyze_all(&slices, false).unwrap();

    let index = build_index(&slices, &Templates::default()).unwrap();
    assert_eq!(index, slices.join("index.html"));

    let html = std::fs::read_to_string(&index).unwrap();
    assert!(html.contains("2P Report"));
    assert!(html.contains("22331001.abf"));
    assert!(html.contains("13:45:00 (+4:30)"));
    assert!(html.contains("TSeries-001/autoanalysis/ref_Window1.png"));
    assert!(!html.contains("Spiral-001"));

    let order: Vec<usize> = ["TSeries-001", "22331001.abf", "ZSeries-001", "LineScan-001"]
        .iter()
        .map(|title| html.find(&format!("</span>{}</summary>", title)).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", order);

    // 72 minutes between the Z-series and the line scan
    assert_eq!(html.matches("<div class=\"spacer\"></div>").count(), 1);
}

#[test]
fn test_run_with_custom_templates() {
    let dir = tempfile::tempdir().unwrap();
    let slices = experiment_day(dir.path());

    let templates_dir = dir.path().join("templates");
    std::fs::create_dir_all(&templates_dir).unwrap();
    std::fs::write(
        templates_dir.join(report::BASE_FILE),
        "<html><title>{{TITLE}}</title>{{CONTENT}}</html>",
    )
    .unwrap();
    std::fs::write(templates_dir.join(report::HEADER_FILE), "<h1>{{TITLE}}</h1>").unwrap();
    std::fs::write(
        templates_dir.join(report::TIMELINE_ITEM_FILE),
        "<item>{{TITLE}}</item>",
    )
    .unwrap();

    let templates = Templates::load(&templates_dir).unwrap();
    let index = report::run(&slices, false, &templates).unwrap();

    let html = std::fs::read_to_string(index).unwrap();
    assert!(html.starts_with("<html><title>2P Report</title><h1>2P Report</h1>"));
    assert_eq!(html.matches("<item>").count(), 4);
    assert!(output(&slices, "ZSeries-001", "proj_red.png").is_file());
}

#[test]
fn test_templates_load_requires_every_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(report::BASE_FILE), "{{CONTENT}}").unwrap();
    assert!(matches!(
        Templates::load(dir.path()),
        Err(ReportError::NotFound(_))
    ));
}
