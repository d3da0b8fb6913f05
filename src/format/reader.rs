//! Decoder facade: metadata, whole-stack reads and single-plane reads.

use async_trait::async_trait;
use ndarray::ArrayD;
use tracing::debug;

use crate::error::FormatError;
use crate::io::RangeReader;
use crate::metadata::{OmeMetadata, RawImageMetadata};
use crate::normalize::PlaneSource;

use super::detect::check_tiff_signature;
use super::imagej::{parse_imagej_description, synthesize_metadata, PageGeometry};
use super::ome::{is_ome_xml, parse_ome_xml};
use super::planes::{build_plane_maps, PlaneMap};
use super::stack::read_stack;
use super::tiff::TiffFile;

/// Where the metadata of an opened file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    OmeXml,
    ImageJ,
    Synthesized,
}

/// An opened image file.
///
/// Owns the underlying reader; dropping the `ImageFileReader` releases it.
pub struct ImageFileReader<R: RangeReader> {
    tiff: TiffFile<R>,
    metadata: OmeMetadata,
    metadata_source: MetadataSource,
    plane_maps: Vec<PlaneMap>,
}

impl<R: RangeReader> ImageFileReader<R> {
    /// Open a file and decode its metadata.
    ///
    /// # Arguments
    /// * `reader` - Range reader over the file's bytes
    /// * `name` - Display name used for synthesized metadata
    ///
    /// # Errors
    /// - `UnsupportedFormat` if the file is not a TIFF
    /// - `Tiff` for structural errors
    /// - `Metadata` for malformed OME-XML or a series too large to decode
    pub async fn open(reader: R, name: &str) -> Result<Self, FormatError> {
        check_tiff_signature(&reader).await?;
        let tiff = TiffFile::open(reader).await?;

        let (metadata, metadata_source) = match tiff.description() {
            Some(description) if is_ome_xml(description) => {
                (parse_ome_xml(description)?, MetadataSource::OmeXml)
            }
            description => {
                let imagej = description.and_then(parse_imagej_description);
                let layout = tiff.page_layout(0).await?;
                let geometry = PageGeometry {
                    width: layout.width,
                    height: layout.height,
                    samples_per_pixel: layout.samples_per_pixel,
                };
                let source = if imagej.is_some() {
                    MetadataSource::ImageJ
                } else {
                    MetadataSource::Synthesized
                };
                (
                    synthesize_metadata(name, tiff.page_count(), geometry, imagej)?,
                    source,
                )
            }
        };

        let plane_maps = build_plane_maps(&metadata, tiff.page_count());

        debug!(
            file = tiff.identifier(),
            series = metadata.images.len(),
            instruments = metadata.instruments.len(),
            source = ?metadata_source,
            "Decoded image metadata"
        );

        Ok(Self {
            tiff,
            metadata,
            metadata_source,
            plane_maps,
        })
    }

    pub fn metadata(&self) -> &OmeMetadata {
        &self.metadata
    }

    pub fn metadata_source(&self) -> MetadataSource {
        self.metadata_source
    }

    pub fn series_count(&self) -> usize {
        self.metadata.images.len()
    }

    pub fn page_count(&self) -> usize {
        self.tiff.page_count()
    }

    pub fn identifier(&self) -> &str {
        self.tiff.identifier()
    }

    /// Read a whole series as one dense array in the file's own axis order.
    pub async fn read_stack(&self, series: usize) -> Result<ArrayD<f64>, FormatError> {
        let (image, planes) = self.series(series)?;
        read_stack(&self.tiff, &image.pixels, planes).await
    }

    fn series(&self, series: usize) -> Result<(&RawImageMetadata, &PlaneMap), FormatError> {
        match (self.metadata.images.get(series), self.plane_maps.get(series)) {
            (Some(image), Some(planes)) => Ok((image, planes)),
            _ => Err(FormatError::Metadata {
                message: format!(
                    "series {} out of range (file has {})",
                    series,
                    self.metadata.images.len()
                ),
            }),
        }
    }
}

#[async_trait]
impl<R: RangeReader> PlaneSource for ImageFileReader<R> {
    /// Channel `c` counts samples: every sample of an RGB channel returns the
    /// full `(h, w, samples)` page.
    async fn read_plane(
        &self,
        c: usize,
        z: usize,
        t: usize,
        series: usize,
    ) -> Result<Option<ArrayD<f64>>, FormatError> {
        let (image, planes) = self.series(series)?;
        let channel = c / image.pixels.samples_per_channel();
        match planes.page(channel, z, t) {
            Some(page) => Ok(Some(self.tiff.read_page(page).await?)),
            None => Ok(None),
        }
    }
}
