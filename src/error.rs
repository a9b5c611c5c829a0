use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading from local files
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Underlying file system error
    #[error("File error on {path}: {message}")]
    File { path: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl IoError {
    /// Wrap a std I/O error together with the path it happened on.
    pub fn file(path: impl Into<String>, err: &std::io::Error) -> Self {
        IoError::File {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Errors that can occur when parsing or decoding TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The input path does not exist
    #[error("file does not exist: {0}")]
    NotFound(PathBuf),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (only uncompressed data is supported)")]
    UnsupportedCompression(String),

    /// Bit depth outside 8/16/32 (or not 8 for RGB)
    #[error("unsupported TIF depth: {0}-bit")]
    UnsupportedDepth(u16),

    /// Samples per pixel not valid for the photometric interpretation
    #[error("unsupported samples per pixel: {0}")]
    UnsupportedSampleCount(u16),

    /// Color interpretation other than grayscale or RGB
    #[error("unsupported photometric interpretation: {0}")]
    UnsupportedPhotometric(u16),

    /// Planar (non-chunky) sample layout
    #[error("unsupported planar configuration: {0}")]
    UnsupportedPlanarConfiguration(u16),

    /// Strip data ended before the image was filled
    #[error("Truncated image data: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: u64, actual: u64 },
}

/// Errors raised by image operations and encoding
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Decoding a source TIFF failed
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Grid values do not match the declared dimensions
    #[error("Invalid image dimensions: {width}x{height} does not match {len} values")]
    InvalidDimensions {
        width: usize,
        height: usize,
        len: usize,
    },

    /// Images in a stack do not share width and height
    #[error("images must all have the same dimensions: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    /// Projection requested over zero images
    #[error("cannot project an empty image stack")]
    EmptyStack,

    /// Output path has an extension we cannot encode
    #[error("unsupported output format: {0}")]
    UnsupportedOutput(String),

    /// Encoding or writing the output file failed
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },

    /// Input path is not usable for conversion
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Listing or writing files failed
    #[error("File error on {path}: {message}")]
    Io { path: String, message: String },
}

impl ImageError {
    /// Wrap a std I/O error together with the path it happened on.
    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        ImageError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors that can occur when reading PrairieView scan metadata
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// I/O error while reading metadata files
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Folder or XML file does not exist
    #[error("does not exist: {0}")]
    NotFound(PathBuf),

    /// XML text could not be parsed
    #[error("Invalid XML in {path}: {message}")]
    Xml { path: String, message: String },

    /// No known scan-type marker in the XML
    #[error("unsupported XML scan type: {0}")]
    UnsupportedScanType(String),

    /// A recognized key holds a value we cannot interpret
    #[error("unsupported {key}: {value}")]
    UnsupportedValue { key: &'static str, value: String },

    /// Mandatory configuration key is missing
    #[error("key not found: {0}")]
    MissingKey(String),

    /// Mandatory XML attribute is missing
    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// Value failed to parse as the expected type
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Document structure does not match the detected scan type
    #[error("invalid scan: {0}")]
    InvalidScan(String),
}

/// Errors that can occur when reading ABF headers
#[derive(Debug, Clone, Error)]
pub enum AbfError {
    /// I/O error while reading the header
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// First four bytes are not an ABF signature
    #[error("Unknown ABF signature: {0:?}")]
    UnknownSignature([u8; 4]),

    /// Header date fields do not form a valid timestamp
    #[error("unexpected creation date in header: {0}")]
    InvalidDate(u32),
}

/// Errors raised while analyzing folders and writing reports
#[derive(Debug, Error)]
pub enum ReportError {
    /// File system error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Folder or template missing
    #[error("does not exist: {0}")]
    NotFound(PathBuf),

    /// Folder is not a scan folder
    #[error("not a scan folder: {0}")]
    NotAScan(PathBuf),

    /// Image processing failed
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Scan metadata failed
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// No items to place on a timeline
    #[error("no timeline items found in {0}")]
    EmptyTimeline(PathBuf),
}

impl ReportError {
    /// Attach a path to a std I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}
