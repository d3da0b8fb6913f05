//! File conversion.
//!
//! One call converts one file, start to finish:
//!
//! ```text
//! file.file ──► route by extension ──► open reader ──► decode metadata
//!                                                           │
//!      ┌────────────────── create instruments ◄─────────────┘
//!      ▼
//!  for each series:
//!      normalize array (stack or plane path)
//!      create position / timepoint / channels
//!      map payload ──► create_representation ──► handle
//! ```
//!
//! The first error aborts the call. The reader is owned by the decoder and
//! released when the call returns, on success and on every error path.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConvertError;
use crate::format::{file_name, route_by_extension, DecodePath, ImageFileReader, MetadataSource};
use crate::io::RangeReader;
use crate::mapping::{
    channel_input, channel_views, position_input, representation_input, timepoint_input,
    ConversionContext, ConversionOptions, InstrumentMap, OmeroFile, SeriesRefs,
};
use crate::metadata::{OmeMetadata, RawImageMetadata};
use crate::normalize::{normalize_planes, normalize_stack, NormalizedArray};
use crate::source::FileSource;
use crate::submit::{RepresentationHandle, SubmissionClient};

// =============================================================================
// Request
// =============================================================================

/// Arguments of one `convert_omero_file` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertRequest {
    /// The file to convert
    pub file: OmeroFile,

    #[serde(flatten)]
    pub context: ConversionContext,

    #[serde(flatten)]
    pub options: ConversionOptions,
}

impl ConvertRequest {
    pub fn new(file: OmeroFile) -> Self {
        Self {
            file,
            context: ConversionContext::default(),
            options: ConversionOptions::default(),
        }
    }
}

// =============================================================================
// Converter
// =============================================================================

/// Converts files from a [`FileSource`] and submits them through a
/// [`SubmissionClient`].
pub struct Converter<S, C> {
    source: S,
    client: C,
}

impl<S: FileSource, C: SubmissionClient> Converter<S, C> {
    pub fn new(source: S, client: C) -> Self {
        Self { source, client }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Convert one file; see [`convert_omero_file`].
    pub async fn convert(
        &self,
        request: &ConvertRequest,
    ) -> Result<Vec<RepresentationHandle>, ConvertError> {
        convert_omero_file(
            &self.source,
            &self.client,
            &request.file,
            &request.context,
            &request.options,
        )
        .await
    }

    /// Decode a file's metadata without submitting anything.
    pub async fn inspect(&self, location: &str) -> Result<InspectReport, ConvertError> {
        inspect_file(&self.source, location).await
    }
}

/// Convert every series of `file` into a representation.
///
/// # Returns
/// One handle per series, in series order.
///
/// # Errors
/// - `Precondition` if the file has no storage location, or an era without a
///   start is used for timepoints
/// - `Format` for unsupported extensions (before anything is read or
///   submitted) and decoding failures
/// - `Normalize` if pixels do not fit the declared dimensions
/// - `Submit` for the first failed remote call
pub async fn convert_omero_file<S, C>(
    source: &S,
    client: &C,
    file: &OmeroFile,
    context: &ConversionContext,
    options: &ConversionOptions,
) -> Result<Vec<RepresentationHandle>, ConvertError>
where
    S: FileSource + ?Sized,
    C: SubmissionClient + ?Sized,
{
    let location = file
        .file
        .as_deref()
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .ok_or_else(|| ConvertError::Precondition("No file provided".to_string()))?;

    let path = route_by_extension(location)?;
    let reader = source.open(location).await?;
    let decoder = ImageFileReader::open(reader, file_name(location)).await?;
    let metadata = decoder.metadata();

    info!(
        file = %file.name,
        location,
        path = path.name(),
        series = metadata.images.len(),
        "Converting file"
    );

    let instruments = InstrumentMap::create(client, &metadata.instruments).await?;

    let mut handles = Vec::with_capacity(metadata.images.len());
    for (index, image) in metadata.images.iter().enumerate() {
        let array = read_series(&decoder, path, image, index).await?;
        let refs = create_series_refs(client, &instruments, image, context, options).await?;
        let input = representation_input(file, context, image, index, refs);

        let handle = client.create_representation(&array, &input).await?;
        debug!(
            series = index,
            id = %handle.id,
            shape = ?array.shape(),
            dims = %array.dims_string(),
            "Converted series"
        );
        handles.push(handle);
    }

    info!(file = %file.name, representations = handles.len(), "Conversion finished");
    Ok(handles)
}

async fn read_series<R: RangeReader>(
    decoder: &ImageFileReader<R>,
    path: DecodePath,
    image: &RawImageMetadata,
    index: usize,
) -> Result<NormalizedArray, ConvertError> {
    match path {
        DecodePath::SimpleStack => Ok(normalize_stack(decoder.read_stack(index).await?)?),
        DecodePath::PlaneIndexed => normalize_planes(decoder, &image.pixels, index).await,
    }
}

/// Create the position, timepoint and channels of one series.
async fn create_series_refs<C>(
    client: &C,
    instruments: &InstrumentMap,
    image: &RawImageMetadata,
    context: &ConversionContext,
    options: &ConversionOptions,
) -> Result<SeriesRefs, ConvertError>
where
    C: SubmissionClient + ?Sized,
{
    let position = match position_input(&image.pixels, context.stage.as_ref(), options) {
        Some(input) => Some(client.create_position(&input).await?),
        None => None,
    };

    let timepoint = match timepoint_input(image, context.era.as_ref(), options)? {
        Some(input) => Some(client.create_timepoint(&input).await?),
        None => None,
    };

    let mut views = Vec::new();
    if options.channels_from_channels {
        let mut created = Vec::with_capacity(image.pixels.channels.len());
        for (index, channel) in image.pixels.channels.iter().enumerate() {
            created.push(client.create_channel(&channel_input(index, channel)).await?);
        }
        views = channel_views(&created);
    }

    Ok(SeriesRefs {
        instrument: instruments.get(image.instrument_ref.as_deref()).cloned(),
        position,
        timepoint,
        views,
    })
}

// =============================================================================
// Inspection
// =============================================================================

/// Decoded view of a file, as printed by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub location: String,
    pub decode_path: DecodePath,
    pub metadata_source: MetadataSource,
    pub page_count: usize,
    pub metadata: OmeMetadata,
}

/// Route and decode `location` without reading pixels.
pub async fn inspect_file<S>(source: &S, location: &str) -> Result<InspectReport, ConvertError>
where
    S: FileSource + ?Sized,
{
    let decode_path = route_by_extension(location)?;
    let reader = source.open(location).await?;
    let decoder = ImageFileReader::open(reader, file_name(location)).await?;

    Ok(InspectReport {
        location: location.to_string(),
        decode_path,
        metadata_source: decoder.metadata_source(),
        page_count: decoder.page_count(),
        metadata: decoder.metadata().clone(),
    })
}
