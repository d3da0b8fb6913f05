use thiserror::Error;

/// I/O errors that can occur when reading from local or remote storage
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object or file not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Local filesystem error
    #[error("Local I/O error: {0}")]
    Local(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Local(err.to_string()),
        }
    }
}

/// Errors related to format routing and metadata extraction
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported by any decode path (maps to HTTP 415)
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Embedded metadata could not be interpreted
    #[error("Invalid metadata: {message}")]
    Metadata { message: String },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

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

    /// Invalid IFD offset (points outside file or loops back)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (supported: none, Deflate, PackBits)")]
    UnsupportedCompression(String),

    /// Unsupported bit depth / sample format combination
    #[error("Unsupported sample format: {bits} bits per sample, sample format {format}")]
    UnsupportedSampleFormat { bits: u16, format: u16 },

    /// Unsupported differencing predictor
    #[error("Unsupported predictor: {0}")]
    UnsupportedPredictor(u16),

    /// Compressed chunk could not be inflated
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Page index beyond the IFD chain
    #[error("Page {index} out of range (file has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// Pages of one stack do not share a shape
    #[error("Inconsistent page shapes in stack: expected {expected:?}, got {actual:?}")]
    InconsistentPages {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised while bringing decoded pixels into canonical 5-D layout
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// Simple-stack input outside the supported 2..=5 dimensions
    #[error("Unsupported stack dimensionality: {ndim} (expected 2 to 5 dimensions)")]
    UnsupportedDimensionality { ndim: usize },

    /// Plane cannot be stored at the declared (size_x, size_y) slot
    #[error("Plane shape {actual:?} does not fit declared size ({size_x}, {size_y})")]
    PlaneShapeMismatch {
        actual: Vec<usize>,
        size_x: usize,
        size_y: usize,
    },

    /// RGB composite has no slice for the requested channel
    #[error("Channel {channel} out of range for plane with {available} samples")]
    ChannelOutOfRange { channel: usize, available: usize },

    /// Declared 5-D shape holds more samples than can be allocated
    #[error("Array shape {shape:?} exceeds {limit} samples")]
    ArrayTooLarge { shape: Vec<usize>, limit: usize },
}

/// Errors returned by the submission client
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote service answered with a non-success status
    #[error("Remote service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Remote response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local sink could not persist the record
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SubmitError::InvalidResponse(err.to_string())
        } else {
            SubmitError::Http(err.to_string())
        }
    }
}

/// Errors that abort a file conversion
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Caller-side precondition violated (missing file, era without start)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Decoding or routing failure
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Array normalization failure
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Remote submission failure (never retried)
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),
}

impl From<TiffError> for ConvertError {
    fn from(err: TiffError) -> Self {
        ConvertError::Format(FormatError::Tiff(err))
    }
}

impl From<IoError> for ConvertError {
    fn from(err: IoError) -> Self {
        ConvertError::Format(FormatError::Io(err))
    }
}
