//! Test utilities for integration tests.
//!
//! Builders for uncompressed strip TIFFs, PrairieView XML documents and
//! ABF headers, plus helpers that lay them out as acquisition folders.

use std::path::{Path, PathBuf};

// =============================================================================
// Strip TIFF Builder
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

/// Builder for single-image TIFFs with pixel data ahead of the IFD, the
/// way acquisition software commonly writes them.
pub struct StripTiffBuilder {
    byte_order: ByteOrderType,
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    photometric: u16,
    sample_format: Option<u16>,
    rows_per_strip: u32,
    software: Option<String>,
    samples: Samples,
}

impl StripTiffBuilder {
    fn with_samples(width: u32, height: u32, samples_per_pixel: u16, samples: Samples) -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            width,
            height,
            samples_per_pixel,
            photometric: if samples_per_pixel == 1 { 1 } else { 2 },
            sample_format: None,
            rows_per_strip: height,
            software: None,
            samples,
        }
    }

    pub fn gray8(width: u32, height: u32, values: &[u8]) -> Self {
        Self::with_samples(width, height, 1, Samples::U8(values.to_vec()))
    }

    pub fn gray16(width: u32, height: u32, values: &[u16]) -> Self {
        Self::with_samples(width, height, 1, Samples::U16(values.to_vec()))
    }

    pub fn gray32_float(width: u32, height: u32, values: &[f32]) -> Self {
        let mut builder = Self::with_samples(width, height, 1, Samples::F32(values.to_vec()));
        builder.sample_format = Some(3);
        builder
    }

    /// Interleaved 8-bit color; `channels` is 3 (RGB) or 4 (RGBA).
    pub fn rgb8(width: u32, height: u32, channels: u16, values: &[u8]) -> Self {
        Self::with_samples(width, height, channels, Samples::U8(values.to_vec()))
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = rows;
        self
    }

    pub fn with_software(mut self, software: &str) -> Self {
        self.software = Some(software.to_string());
        self
    }

    fn bits_per_sample(&self) -> u16 {
        match self.samples {
            Samples::U8(_) => 8,
            Samples::U16(_) => 16,
            Samples::F32(_) => 32,
        }
    }

    fn pixel_bytes(&self) -> Vec<u8> {
        let be = self.byte_order == ByteOrderType::BigEndian;
        match &self.samples {
            Samples::U8(values) => values.clone(),
            Samples::U16(values) => values
                .iter()
                .flat_map(|v| if be { v.to_be_bytes() } else { v.to_le_bytes() })
                .collect(),
            Samples::F32(values) => values
                .iter()
                .flat_map(|v| if be { v.to_be_bytes() } else { v.to_le_bytes() })
                .collect(),
        }
    }

    /// Build the TIFF file data.
    pub fn build(&self) -> Vec<u8> {
        let pixels = self.pixel_bytes();
        let row_bytes = pixels.len() / self.height.max(1) as usize;
        let strip_len = (row_bytes * self.rows_per_strip as usize).max(1);

        let mut data = Vec::new();
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        self.write_u16(&mut data, 42);
        self.write_u32(&mut data, 0); // first IFD offset, patched below

        let mut strip_offsets = Vec::new();
        let mut strip_byte_counts = Vec::new();
        for strip in pixels.chunks(strip_len) {
            strip_offsets.push(data.len() as u32);
            strip_byte_counts.push(strip.len() as u32);
            data.extend_from_slice(strip);
        }
        if data.len() % 2 == 1 {
            data.push(0);
        }

        let ifd_offset = data.len() as u32;
        let patched = self.u32_bytes(ifd_offset);
        data[4..8].copy_from_slice(&patched);

        let spp = self.samples_per_pixel;
        let mut entries = vec![
            self.long_entry(256, &[self.width]),
            self.long_entry(257, &[self.height]),
            self.short_entry(258, &vec![self.bits_per_sample(); spp as usize]),
            self.short_entry(259, &[1]),
            self.short_entry(262, &[self.photometric]),
        ];
        if let Some(software) = &self.software {
            let mut text = software.as_bytes().to_vec();
            text.push(0);
            entries.push(IfdEntry {
                tag: 305,
                field_type: 2,
                count: text.len() as u32,
                payload: text,
            });
        }
        entries.push(self.long_entry(273, &strip_offsets));
        entries.push(self.short_entry(277, &[spp]));
        entries.push(self.long_entry(278, &[self.rows_per_strip]));
        entries.push(self.long_entry(279, &strip_byte_counts));
        if let Some(format) = self.sample_format {
            entries.push(self.short_entry(339, &[format]));
        }
        entries.sort_by_key(|e| e.tag);

        let external_base = ifd_offset as usize + 2 + entries.len() * 12 + 4;
        let mut external = Vec::new();

        self.write_u16(&mut data, entries.len() as u16);
        for entry in &entries {
            self.write_u16(&mut data, entry.tag);
            self.write_u16(&mut data, entry.field_type);
            self.write_u32(&mut data, entry.count);
            if entry.payload.len() <= 4 {
                let mut inline = entry.payload.clone();
                inline.resize(4, 0);
                data.extend_from_slice(&inline);
            } else {
                self.write_u32(&mut data, (external_base + external.len()) as u32);
                external.extend_from_slice(&entry.payload);
                if external.len() % 2 == 1 {
                    external.push(0);
                }
            }
        }
        self.write_u32(&mut data, 0); // no next IFD
        data.extend_from_slice(&external);
        data
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, self.build()).unwrap();
        path.to_path_buf()
    }

    fn short_entry(&self, tag: u16, values: &[u16]) -> IfdEntry {
        let mut payload = Vec::new();
        for &v in values {
            self.write_u16(&mut payload, v);
        }
        IfdEntry {
            tag,
            field_type: 3,
            count: values.len() as u32,
            payload,
        }
    }

    fn long_entry(&self, tag: u16, values: &[u32]) -> IfdEntry {
        let mut payload = Vec::new();
        for &v in values {
            self.write_u32(&mut payload, v);
        }
        IfdEntry {
            tag,
            field_type: 4,
            count: values.len() as u32,
            payload,
        }
    }

    fn u32_bytes(&self, value: u32) -> [u8; 4] {
        match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        }
    }

    fn write_u16(&self, data: &mut Vec<u8>, value: u16) {
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend(&value.to_le_bytes()),
            ByteOrderType::BigEndian => data.extend(&value.to_be_bytes()),
        }
    }

    fn write_u32(&self, data: &mut Vec<u8>, value: u32) {
        data.extend(&self.u32_bytes(value));
    }
}

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    payload: Vec<u8>,
}

// =============================================================================
// PrairieView XML Fixtures
// =============================================================================

const ROOT_SHARD: &str = r#"
  <PVStateShard>
    <PVStateValue key="activeMode" value="Galvo" />
    <PVStateValue key="bitDepth" value="13" />
    <PVStateValue key="dwellTime" value="3.2" />
    <PVStateValue key="framePeriod" value="0.5" />
    <PVStateValue key="laserPower">
      <IndexedValue index="0" value="20" description="Imaging" />
      <IndexedValue index="1" value="0" description="Uncaging" />
    </PVStateValue>
    <PVStateValue key="micronsPerPixel">
      <IndexedValue index="XAxis" value="0.25" />
      <IndexedValue index="YAxis" value="0.25" />
      <IndexedValue index="ZAxis" value="1" />
    </PVStateValue>
    <PVStateValue key="opticalZoom" value="4" />
    <PVStateValue key="pmtGain">
      <IndexedValue index="0" value="700" description="PMT 1 HV" />
      <IndexedValue index="1" value="650" description="PMT 2 HV" />
    </PVStateValue>
    <PVStateValue key="rastersPerFrame" value="1" />
    <PVStateValue key="zDevice" value="0" />
  </PVStateShard>"#;

/// Complete document with the standard root shard around `sequences`.
pub fn pv_document(date: &str, sequences: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<PVScan version="5.5.64.500" date="{}" notes="">
  <SystemIDs SystemID="4321" />{}
{}
</PVScan>"#,
        date, ROOT_SHARD, sequences
    )
}

fn frame_files(prefix: &str, cycle: u32, index: usize) -> String {
    (1..=2)
        .map(|ch| {
            format!(
                r#"      <File channel="{ch}" channelName="Ch{ch}" filename="{prefix}_Cycle{cycle:05}_Ch{ch}_{index:06}.ome.tif" />"#,
                ch = ch,
                prefix = prefix,
                cycle = cycle,
                index = index
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// T-series with `frames` frames 0.5 s apart.
pub fn tseries_xml(name: &str, date: &str, frames: usize) -> String {
    let body: String = (1..=frames)
        .map(|i| {
            format!(
                "    <Frame relativeTime=\"{}\" absoluteTime=\"{}\" index=\"{}\">\n{}\n    </Frame>\n",
                (i - 1) as f64 * 0.5,
                1.0 + (i - 1) as f64 * 0.5,
                i,
                frame_files(name, 1, i)
            )
        })
        .collect();
    pv_document(
        date,
        &format!(
            "  <Sequence type=\"TSeries Timed Element\" cycle=\"1\" time=\"13:40:30.5\">\n{}  </Sequence>",
            body
        ),
    )
}

/// Z-series with `frames` planes 0.25 s apart.
pub fn zseries_xml(name: &str, date: &str, frames: usize) -> String {
    let body: String = (1..=frames)
        .map(|i| {
            format!(
                "    <Frame relativeTime=\"{}\" absoluteTime=\"{}\" index=\"{}\">\n{}\n    </Frame>\n",
                (i - 1) as f64 * 0.25,
                2.0 + (i - 1) as f64 * 0.25,
                i,
                frame_files(name, 1, i)
            )
        })
        .collect();
    pv_document(
        date,
        &format!(
            "  <Sequence type=\"ZSeries\" cycle=\"1\" time=\"09:12:00.0\">\n{}  </Sequence>",
            body
        ),
    )
}

/// TZ-series: one Z stack per entry of `times`, `planes` planes each.
pub fn tzseries_xml(date: &str, times: &[&str], planes: usize) -> String {
    let sequences: String = times
        .iter()
        .enumerate()
        .map(|(cycle, time)| {
            let frames: String = (1..=planes)
                .map(|i| {
                    format!(
                        "    <Frame relativeTime=\"{}\" absoluteTime=\"{}\" index=\"{}\" />\n",
                        (i - 1) as f64 * 0.1,
                        (i - 1) as f64 * 0.1,
                        i
                    )
                })
                .collect();
            format!(
                "  <Sequence type=\"TSeries ZSeries Element\" cycle=\"{}\" time=\"{}\">\n{}  </Sequence>\n",
                cycle + 1,
                time,
                frames
            )
        })
        .collect();
    pv_document(date, &sequences)
}

/// Line scan whose first frame records the line geometry.
pub fn linescan_xml(name: &str, date: &str) -> String {
    pv_document(
        date,
        &format!(
            r#"  <Sequence type="Linescan" cycle="1" time="15:02:10.0">
    <Frame relativeTime="0" absoluteTime="0.5" index="1">
{}
      <PVStateShard>
        <PVStateValue key="pixelsPerLine" value="64" />
        <PVStateValue key="linesPerFrame" value="3" />
        <PVStateValue key="scanLinePeriod" value="0.002" />
      </PVStateShard>
    </Frame>
  </Sequence>"#,
            frame_files(name, 1, 1)
        ),
    )
}

/// Point scan; its traces are exported next to the XML as CSV.
pub fn pointscan_xml(date: &str) -> String {
    pv_document(
        date,
        r#"  <Sequence type="Point Scan" cycle="1" time="14:10:00.0" />"#,
    )
}

/// Document whose only sequence type no scan kind recognizes.
pub fn unknown_scan_xml(date: &str) -> String {
    pv_document(
        date,
        r#"  <Sequence type="Spiral Scan" cycle="1" time="10:00:00.0" />"#,
    )
}

/// Write `xml` as `<folder>/<folder name>.xml`, creating the folder.
pub fn write_scan_xml(folder: &Path, xml: &str) -> PathBuf {
    std::fs::create_dir_all(folder).unwrap();
    let name = folder.file_name().unwrap().to_string_lossy().into_owned();
    let path = folder.join(format!("{}.xml", name));
    std::fs::write(&path, xml).unwrap();
    path
}

/// Write one 16-bit frame per channel for frames `1..=frames`, filled with
/// `value(channel, frame)`.
pub fn write_channel_frames(
    folder: &Path,
    prefix: &str,
    frames: usize,
    width: u32,
    height: u32,
    value: impl Fn(u8, usize) -> u16,
) {
    for channel in 1..=2u8 {
        for frame in 1..=frames {
            let pixels = vec![value(channel, frame); (width * height) as usize];
            let name = format!("{}_Cycle00001_Ch{}_{:06}.ome.tif", prefix, channel, frame);
            StripTiffBuilder::gray16(width, height, &pixels).write_to(&folder.join(name));
        }
    }
}

// =============================================================================
// ABF Headers
// =============================================================================

/// Minimal ABF2 file whose header records `date` (YYYYMMDD) and the
/// start time in milliseconds after midnight.
pub fn create_abf2(date: u32, millis: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(512);
    data.extend_from_slice(b"ABF2");
    data.extend_from_slice(&[0x00, 0x00, 0x08, 0x02]); // file version 2.8
    data.extend_from_slice(&0u32.to_le_bytes()); // file info size
    data.extend_from_slice(&0u32.to_le_bytes()); // actual episodes
    data.extend_from_slice(&date.to_le_bytes());
    data.extend_from_slice(&millis.to_le_bytes());
    data.resize(512, 0);
    data
}

// =============================================================================
// Validation Helpers
// =============================================================================

/// PNG signature check.
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(b"\x89PNG\r\n\x1a\n")
}

pub fn decode_png(path: &Path) -> image::RgbImage {
    image::open(path).unwrap().to_rgb8()
}
