//! Decoding, scaling and encoding integration tests.
//!
//! Tests verify:
//! - TIFF files are decoded in either byte order and strip layout
//! - Converted PNGs carry the scaled 8-bit values
//! - Folder conversion and channel projection write the expected files

use pvtools::format::tiff::TiffDecoder;
use pvtools::image::{channel_paths, convert_folder, project_channel};
use pvtools::{convert_file, decode_file, ConvertOptions, Image, ImageError, TiffError};

use super::test_utils::{decode_png, is_png, ByteOrderType, StripTiffBuilder};

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_big_endian_16bit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = StripTiffBuilder::gray16(3, 2, &[1, 256, 4095, 0, 65535, 7])
        .with_byte_order(ByteOrderType::BigEndian)
        .write_to(&dir.path().join("be.tif"));

    let image = decode_file(&path).unwrap();
    assert_eq!(image.width(), 3);
    assert_eq!(image.height(), 2);
    assert_eq!(image.values(), &[1.0, 256.0, 4095.0, 0.0, 65535.0, 7.0]);
    assert_eq!(image.bits_per_sample(), 16);
}

#[test]
fn test_one_row_per_strip() {
    let dir = tempfile::tempdir().unwrap();
    let values: Vec<u8> = (0..12).collect();
    let path = StripTiffBuilder::gray8(4, 3, &values)
        .with_rows_per_strip(1)
        .write_to(&dir.path().join("strips.tif"));

    let decoder = TiffDecoder::open(&path).unwrap();
    assert_eq!(decoder.info().strip_count, 3);
    let image = decoder.decode().unwrap();
    assert_eq!(image.row(2), &[8.0, 9.0, 10.0, 11.0]);
}

#[test]
fn test_float_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = StripTiffBuilder::gray32_float(2, 1, &[-1.5, 1024.25])
        .with_byte_order(ByteOrderType::BigEndian)
        .write_to(&dir.path().join("float.tif"));

    let image = Image::open(&path).unwrap();
    assert_eq!(image.values(), &[-1.5, 1024.25]);
}

#[test]
fn test_rgb_is_channel_mean() {
    let dir = tempfile::tempdir().unwrap();
    let path = StripTiffBuilder::rgb8(2, 1, 3, &[30, 60, 90, 255, 0, 0])
        .write_to(&dir.path().join("rgb.tif"));

    let image = decode_file(&path).unwrap();
    assert_eq!(image.values(), &[60.0, 85.0]);
}

#[test]
fn test_info_reports_software() {
    let dir = tempfile::tempdir().unwrap();
    let path = StripTiffBuilder::gray16(2, 2, &[0; 4])
        .with_software("Prairie View 5.5.64.500")
        .write_to(&dir.path().join("sw.tif"));

    let decoder = TiffDecoder::open(&path).unwrap();
    let info = decoder.info();
    assert_eq!(info.software.as_deref(), Some("Prairie View 5.5.64.500"));
    assert!(!info.big_endian);
    assert!(!info.bigtiff);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = decode_file(dir.path().join("absent.tif"));
    assert!(matches!(result, Err(TiffError::NotFound(_))));
}

#[test]
fn test_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = StripTiffBuilder::gray16(2, 2, &[1, 2, 3, 4]).build();
    // pixel data sits right after the header; cut into it and the IFD
    let path = dir.path().join("cut.tif");
    std::fs::write(&path, &data[..10]).unwrap();
    assert!(decode_file(&path).is_err());
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_convert_file_stretches_percentiles() {
    let dir = tempfile::tempdir().unwrap();
    let input = StripTiffBuilder::gray16(4, 1, &[0, 255, 510, 1020])
        .write_to(&dir.path().join("frame.tif"));
    let output = dir.path().join("frame.png");

    convert_file(&input, &output, &ConvertOptions::default()).unwrap();

    assert!(is_png(&std::fs::read(&output).unwrap()));
    let png = decode_png(&output);
    assert_eq!((png.width(), png.height()), (4, 1));
    let row: Vec<u8> = (0..4).map(|x| png.get_pixel(x, 0).0[0]).collect();
    assert_eq!(row, vec![0, 63, 127, 255]);
}

#[test]
fn test_convert_without_autoscale_clamps() {
    let dir = tempfile::tempdir().unwrap();
    let input = StripTiffBuilder::gray16(3, 1, &[10, 200, 4000])
        .write_to(&dir.path().join("frame.tif"));
    let output = dir.path().join("frame.bmp");
    let options = ConvertOptions {
        autoscale: false,
        ..ConvertOptions::default()
    };

    convert_file(&input, &output, &options).unwrap();

    let bmp = image::open(&output).unwrap().to_rgb8();
    let row: Vec<u8> = (0..3).map(|x| bmp.get_pixel(x, 0).0[0]).collect();
    assert_eq!(row, vec![10, 200, 255]);
}

#[test]
fn test_odd_width_keeps_logical_width() {
    let dir = tempfile::tempdir().unwrap();
    let input = StripTiffBuilder::gray8(5, 2, &[0, 50, 100, 150, 200, 250, 200, 150, 100, 50])
        .write_to(&dir.path().join("odd.tif"));
    let output = dir.path().join("odd.png");

    let options = ConvertOptions {
        autoscale: false,
        ..ConvertOptions::default()
    };
    convert_file(&input, &output, &options).unwrap();

    let png = decode_png(&output);
    assert_eq!((png.width(), png.height()), (5, 2));
    assert_eq!(png.get_pixel(4, 1).0, [50, 50, 50]);
}

#[test]
fn test_convert_folder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    StripTiffBuilder::gray8(2, 2, &[0, 1, 2, 3]).write_to(&input.join("b.tif"));
    StripTiffBuilder::gray8(2, 2, &[3, 2, 1, 0]).write_to(&input.join("a.tif"));
    std::fs::write(input.join("notes.txt"), "not an image").unwrap();

    let written = convert_folder(&input, &output, &ConvertOptions::default()).unwrap();
    assert_eq!(written, vec![output.join("a.png"), output.join("b.png")]);
    assert!(written.iter().all(|p| p.is_file()));
}

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_project_channel_writes_both_destinations() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("ZSeries-001");
    StripTiffBuilder::gray16(2, 1, &[160, 800])
        .write_to(&folder.join("ZSeries-001_Cycle00001_Ch2_000001.ome.tif"));
    StripTiffBuilder::gray16(2, 1, &[1600, 320])
        .write_to(&folder.join("ZSeries-001_Cycle00001_Ch2_000002.ome.tif"));
    StripTiffBuilder::gray16(2, 1, &[9999, 9999])
        .write_to(&folder.join("ZSeries-001_Cycle00001_Ch1_000001.ome.tif"));

    assert_eq!(channel_paths(&folder, 2).unwrap().len(), 2);

    let destinations = vec![folder.join("References"), dir.path().to_path_buf()];
    let written = project_channel(&folder, 2, 16.0, &destinations).unwrap();
    assert_eq!(
        written,
        vec![
            folder.join("References/ZSeries-001_projection_Ch2.png"),
            dir.path().join("ZSeries-001_projection_Ch2.png"),
        ]
    );

    // max(160, 1600) / 16 = 100 and max(800, 320) / 16 = 50
    let png = decode_png(&written[1]);
    assert_eq!(png.get_pixel(0, 0).0[0], 100);
    assert_eq!(png.get_pixel(1, 0).0[0], 50);
}

#[test]
fn test_project_channel_without_images() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("ZSeries-002");
    std::fs::create_dir_all(&folder).unwrap();

    let result = project_channel(&folder, 1, 16.0, &[dir.path().to_path_buf()]);
    assert!(matches!(result, Err(ImageError::EmptyStack)));
}
