//! # OMERO Converter
//!
//! Converts microscopy image files (OME-TIFF, ImageJ and plain TIFF stacks)
//! into normalized 5-D arrays with structured metadata, and submits them to a
//! data-management service.
//!
//! ## Features
//!
//! - **Range-based input**: Files are read through byte ranges from the local
//!   filesystem or S3, without downloading them first
//! - **TIFF/BigTIFF decoding**: Strips and tiles, Deflate and PackBits,
//!   integer and float samples
//! - **OME-XML metadata**: Instruments, channels, planes, objective settings
//!   and imaging environment
//! - **Axis normalization**: Whole-stack padding or plane-by-plane assembly
//!   with RGB slicing and X/Y transpose detection
//! - **Submission**: HTTP client for the data platform or an offline
//!   directory sink
//!
//! ## Architecture
//!
//! - [`io`] - Range readers for local files and S3
//! - [`source`] - Storage location to reader
//! - [`mod@format`] - Format routing, TIFF parsing, metadata extraction
//! - [`metadata`] - Decoded metadata model
//! - [`normalize`] - Axis normalizer
//! - [`mapping`] - Metadata mapper
//! - [`submit`] - Submission clients and wire types
//! - [`convert`] - Per-file conversion
//! - [`server`] - HTTP operation registry
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use omero_converter::{
//!     ConvertRequest, Converter, DirectorySubmissionClient, OmeroFile, StorageFileSource,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DirectorySubmissionClient::create("out").await?;
//!     let converter = Converter::new(StorageFileSource::default(), client);
//!
//!     let request = ConvertRequest::new(OmeroFile {
//!         id: "1".to_string(),
//!         name: "stack.ome.tif".to_string(),
//!         file: Some("/data/stack.ome.tif".to_string()),
//!         datasets: Vec::new(),
//!     });
//!     let handles = converter.convert(&request).await?;
//!     println!("{} representation(s)", handles.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod io;
pub mod mapping;
pub mod metadata;
pub mod normalize;
pub mod server;
pub mod source;
pub mod submit;

// Re-export commonly used types
pub use config::{
    Cli, Command, ConvertConfig, InspectConfig, ServeConfig, StorageArgs, SubmissionArgs,
    SubmissionTarget,
};
pub use convert::{convert_omero_file, inspect_file, ConvertRequest, Converter, InspectReport};
pub use error::{ConvertError, FormatError, IoError, NormalizeError, SubmitError, TiffError};
pub use format::tiff::{
    ByteOrder, Compression, FieldType, Ifd, IfdEntry, PageLayout, SampleKind, TiffFile,
    TiffHeader, TiffTag, ValueReader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use format::{
    is_tiff_header, route_by_extension, DecodePath, ImageFileReader, MetadataSource,
};
pub use io::{create_s3_client, LocalFileReader, RangeReader, S3RangeReader};
pub use mapping::{
    ConversionContext, ConversionOptions, Dataset, Era, InstrumentMap, OmeroFile, Stage,
};
pub use metadata::{OmeMetadata, RawImageMetadata};
pub use normalize::{
    normalize_planes, normalize_stack, AxisLabel, NormalizedArray, PlaneSource,
};
pub use server::{
    create_router, health_handler, AppState, ErrorResponse, HealthResponse, OperationDefinition,
    OperationRegistry, RouterConfig,
};
pub use source::{FileReader, FileSource, StorageFileSource};
pub use submit::{
    DirectorySubmissionClient, HttpSubmissionClient, RepresentationHandle, RepresentationInput,
    SubmissionClient,
};
