//! Owned model of a PrairieView scan document.
//!
//! The XML is parsed once with `roxmltree` and copied into plain structs so
//! nothing downstream borrows from the source text.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use roxmltree::{Document, Node};
use serde::Serialize;
use tracing::debug;

use super::state::{parse_value, IndexedValue, StateEntry, StateShard, PV_DATE_FORMAT};
use crate::error::{IoError, ScanError};

/// One image file referenced by a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameFile {
    pub channel: Option<u32>,
    pub channel_name: Option<String>,
    pub filename: String,
}

/// One `Frame` element of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub index: Option<u32>,
    /// Seconds since the sequence started
    pub relative_time: Option<f64>,
    /// Seconds since the scan started
    pub absolute_time: Option<f64>,
    pub files: Vec<FrameFile>,
    /// Settings that changed for this frame
    pub shard: StateShard,
}

/// One `Sequence` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
    /// The `type` attribute, e.g. `TSeries Timed Element`
    pub kind: String,
    /// Wall-clock start, as written by the instrument
    pub time: Option<String>,
    pub cycle: Option<u32>,
    pub frames: Vec<Frame>,
}

/// Parsed `PVScan` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvXml {
    pub path: PathBuf,
    pub version: String,
    /// The raw `date` attribute
    pub date: String,
    pub notes: Option<String>,
    pub shard: StateShard,
    pub sequences: Vec<Sequence>,
}

impl PvXml {
    /// Read and parse an XML file.
    pub fn read(path: &Path) -> Result<Self, ScanError> {
        let text = read_text(path)?;
        Self::parse(&text, path)
    }

    /// Parse document text. `path` is recorded for reporting only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ScanError> {
        let doc = Document::parse(text).map_err(|e| ScanError::Xml {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let root = doc.root_element();
        if !root.has_tag_name("PVScan") {
            return Err(ScanError::InvalidScan(format!(
                "root element is <{}>, expected <PVScan>: {}",
                root.tag_name().name(),
                path.display()
            )));
        }

        let shard = child(root, "PVStateShard")
            .map(read_shard)
            .unwrap_or_default();

        let sequences = children(root, "Sequence")
            .map(read_sequence)
            .collect::<Result<Vec<_>, _>>()?;

        let xml = PvXml {
            path: path.to_path_buf(),
            version: required(root, "PVScan", "version")?.to_string(),
            date: required(root, "PVScan", "date")?.to_string(),
            notes: root.attribute("notes").map(str::to_string),
            shard,
            sequences,
        };

        debug!(
            path = %path.display(),
            version = %xml.version,
            sequences = xml.sequences.len(),
            "Parsed PrairieView XML"
        );
        Ok(xml)
    }

    /// Scan start parsed from the `date` attribute.
    pub fn started(&self) -> Result<NaiveDateTime, ScanError> {
        parse_pv_date(&self.date)
    }

    /// Frames of every sequence, in document order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.sequences.iter().flat_map(|s| s.frames.iter())
    }
}

/// Parse a `PVScan` date such as `3/31/2022 1:40:30 PM`.
pub fn parse_pv_date(value: &str) -> Result<NaiveDateTime, ScanError> {
    NaiveDateTime::parse_from_str(value.trim(), PV_DATE_FORMAT).map_err(|_| {
        ScanError::InvalidValue {
            key: "date".to_string(),
            value: value.to_string(),
        }
    })
}

pub(crate) fn read_text(path: &Path) -> Result<String, ScanError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScanError::NotFound(path.to_path_buf())
        } else {
            ScanError::Io(IoError::file(path.display().to_string(), &e))
        }
    })
}

// =============================================================================
// Element readers
// =============================================================================

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn required<'a>(
    node: Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, ScanError> {
    node.attribute(attribute)
        .ok_or(ScanError::MissingAttribute { element, attribute })
}

fn optional_parsed<T: std::str::FromStr>(
    node: Node<'_, '_>,
    attribute: &str,
) -> Result<Option<T>, ScanError> {
    node.attribute(attribute)
        .map(|v| parse_value(attribute, v))
        .transpose()
}

fn read_shard(node: Node<'_, '_>) -> StateShard {
    let entries = children(node, "PVStateValue")
        .filter_map(|value| {
            let key = value.attribute("key")?;
            let mut indexed = Vec::new();
            for item in value.children().filter(Node::is_element) {
                match item.tag_name().name() {
                    "IndexedValue" => {
                        if let Some(v) = read_indexed(item, item.attribute("index"), None) {
                            indexed.push(v);
                        }
                    }
                    "SubindexedValues" => {
                        let index = item.attribute("index");
                        for sub in children(item, "SubindexedValue") {
                            if let Some(v) = read_indexed(sub, index, sub.attribute("subindex")) {
                                indexed.push(v);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Some(StateEntry {
                key: key.to_string(),
                value: value.attribute("value").map(str::to_string),
                indexed,
            })
        })
        .collect();
    StateShard { entries }
}

fn read_indexed(node: Node<'_, '_>, index: Option<&str>, subindex: Option<&str>) -> Option<IndexedValue> {
    Some(IndexedValue {
        index: index?.to_string(),
        subindex: subindex.map(str::to_string),
        value: node.attribute("value")?.to_string(),
        description: node.attribute("description").map(str::to_string),
    })
}

fn read_sequence(node: Node<'_, '_>) -> Result<Sequence, ScanError> {
    let frames = children(node, "Frame")
        .map(read_frame)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Sequence {
        kind: required(node, "Sequence", "type")?.to_string(),
        time: node.attribute("time").map(str::to_string),
        cycle: optional_parsed(node, "cycle")?,
        frames,
    })
}

fn read_frame(node: Node<'_, '_>) -> Result<Frame, ScanError> {
    let files = children(node, "File")
        .map(|file| {
            Ok(FrameFile {
                channel: optional_parsed(file, "channel")?,
                channel_name: file.attribute("channelName").map(str::to_string),
                filename: required(file, "File", "filename")?.to_string(),
            })
        })
        .collect::<Result<Vec<_>, ScanError>>()?;

    Ok(Frame {
        index: optional_parsed(node, "index")?,
        relative_time: optional_parsed(node, "relativeTime")?,
        absolute_time: optional_parsed(node, "absoluteTime")?,
        files,
        shard: child(node, "PVStateShard")
            .map(read_shard)
            .unwrap_or_default(),
    })
}
