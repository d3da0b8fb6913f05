//! Shared test utilities for integration tests.
//!
//! Provides in-memory readers, a small TIFF writer, a mock file source and a
//! submission client that records every call.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::ZlibEncoder;

use omero_converter::error::{IoError, SubmitError};
use omero_converter::io::{check_range, RangeReader};
use omero_converter::normalize::NormalizedArray;
use omero_converter::source::FileSource;
use omero_converter::submit::{
    ChannelInput, EntityRef, InstrumentInput, PositionInput, RepresentationHandle,
    RepresentationInput, SubmissionClient, TimepointInput,
};

// =============================================================================
// Memory Reader
// =============================================================================

/// Range reader over an in-memory file.
pub struct MemoryReader {
    data: Bytes,
    identifier: String,
}

impl MemoryReader {
    pub fn new(data: impl Into<Bytes>, identifier: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            identifier: identifier.into(),
        }
    }
}

#[async_trait]
impl RangeReader for MemoryReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.data.len() as u64)?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + len))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Mock File Source
// =============================================================================

/// File source serving registered in-memory files by location.
#[derive(Default)]
pub struct MockFileSource {
    files: HashMap<String, Bytes>,
    opened: Mutex<Vec<String>>,
}

impl MockFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, location: &str, data: Vec<u8>) -> Self {
        self.files.insert(location.to_string(), Bytes::from(data));
        self
    }

    /// Locations opened so far, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSource for MockFileSource {
    type Reader = MemoryReader;

    async fn open(&self, location: &str) -> Result<MemoryReader, IoError> {
        self.opened.lock().unwrap().push(location.to_string());
        match self.files.get(location) {
            Some(data) => Ok(MemoryReader::new(data.clone(), location)),
            None => Err(IoError::NotFound(location.to_string())),
        }
    }
}

// =============================================================================
// Recording Client
// =============================================================================

/// A representation as received by [`RecordingClient`].
#[derive(Debug, Clone)]
pub struct RecordedRepresentation {
    pub shape: [usize; 5],
    pub dims: String,
    pub values: Vec<f64>,
    pub input: RepresentationInput,
}

/// Which call of [`RecordingClient`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Instrument,
    Channel,
    Representation,
}

/// Submission client that records inputs and hands out sequential ids.
#[derive(Default)]
pub struct RecordingClient {
    next_id: AtomicU64,
    fail_on: Option<FailOn>,
    pub instruments: Mutex<Vec<InstrumentInput>>,
    pub positions: Mutex<Vec<PositionInput>>,
    pub timepoints: Mutex<Vec<TimepointInput>>,
    pub channels: Mutex<Vec<ChannelInput>>,
    pub representations: Mutex<Vec<RecordedRepresentation>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fail_on: FailOn) -> Self {
        Self {
            fail_on: Some(fail_on),
            ..Self::default()
        }
    }

    /// Total number of remote calls answered successfully.
    pub fn call_count(&self) -> usize {
        self.instruments.lock().unwrap().len()
            + self.positions.lock().unwrap().len()
            + self.timepoints.lock().unwrap().len()
            + self.channels.lock().unwrap().len()
            + self.representations.lock().unwrap().len()
    }

    fn next(&self, kind: &str) -> EntityRef {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        EntityRef::new(format!("{}-{}", kind, n))
    }

    fn check(&self, call: FailOn) -> Result<(), SubmitError> {
        if self.fail_on == Some(call) {
            return Err(SubmitError::Status {
                status: 500,
                message: format!("{:?} rejected", call),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionClient for RecordingClient {
    async fn create_instrument(&self, input: &InstrumentInput) -> Result<EntityRef, SubmitError> {
        self.check(FailOn::Instrument)?;
        self.instruments.lock().unwrap().push(input.clone());
        Ok(self.next("instrument"))
    }

    async fn create_position(&self, input: &PositionInput) -> Result<EntityRef, SubmitError> {
        self.positions.lock().unwrap().push(input.clone());
        Ok(self.next("position"))
    }

    async fn create_timepoint(&self, input: &TimepointInput) -> Result<EntityRef, SubmitError> {
        self.timepoints.lock().unwrap().push(input.clone());
        Ok(self.next("timepoint"))
    }

    async fn create_channel(&self, input: &ChannelInput) -> Result<EntityRef, SubmitError> {
        self.check(FailOn::Channel)?;
        self.channels.lock().unwrap().push(input.clone());
        Ok(self.next("channel"))
    }

    async fn create_representation(
        &self,
        array: &NormalizedArray,
        input: &RepresentationInput,
    ) -> Result<RepresentationHandle, SubmitError> {
        self.check(FailOn::Representation)?;
        self.representations
            .lock()
            .unwrap()
            .push(RecordedRepresentation {
                shape: array.shape(),
                dims: array.dims_string(),
                values: array.data().iter().copied().collect(),
                input: input.clone(),
            });
        let entity = self.next("representation");
        Ok(RepresentationHandle {
            id: entity.id,
            name: input.name.clone(),
        })
    }
}

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Compression applied to strip data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StripCompression {
    None,
    Deflate,
}

/// One page of a test TIFF, stored as a single strip.
#[derive(Clone)]
pub struct PageSpec {
    width: u32,
    height: u32,
    bits: u16,
    samples: u16,
    values: Vec<u64>,
}

impl PageSpec {
    /// 8-bit grayscale page, values in row-major order.
    pub fn gray8(width: u32, height: u32, values: &[u8]) -> Self {
        assert_eq!(values.len(), (width * height) as usize);
        Self {
            width,
            height,
            bits: 8,
            samples: 1,
            values: values.iter().map(|&v| v as u64).collect(),
        }
    }

    /// 16-bit grayscale page, values in row-major order.
    pub fn gray16(width: u32, height: u32, values: &[u16]) -> Self {
        assert_eq!(values.len(), (width * height) as usize);
        Self {
            width,
            height,
            bits: 16,
            samples: 1,
            values: values.iter().map(|&v| v as u64).collect(),
        }
    }

    /// 8-bit chunky RGB page, `[r, g, b]` per pixel in row-major order.
    pub fn rgb8(width: u32, height: u32, pixels: &[[u8; 3]]) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            bits: 8,
            samples: 3,
            values: pixels.iter().flatten().map(|&v| v as u64).collect(),
        }
    }

    /// 8-bit page whose pixel at `(row, col)` is `base + row * width + col`.
    pub fn ramp8(width: u32, height: u32, base: u8) -> Self {
        let values: Vec<u8> = (0..width * height)
            .map(|i| base.wrapping_add(i as u8))
            .collect();
        Self::gray8(width, height, &values)
    }
}

/// Builder for creating test TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    compression: StripCompression,
    description: Option<String>,
    pages: Vec<PageSpec>,
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u64,
    payload: Vec<u8>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            compression: StripCompression::None,
            description: None,
            pages: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn with_compression(mut self, compression: StripCompression) -> Self {
        self.compression = compression;
        self
    }

    /// ImageDescription of the first page.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_page(mut self, page: PageSpec) -> Self {
        self.pages.push(page);
        self
    }

    pub fn add_pages(mut self, pages: impl IntoIterator<Item = PageSpec>) -> Self {
        self.pages.extend(pages);
        self
    }

    /// Build the TIFF file data.
    ///
    /// Each page is written as its external values and strip, followed by
    /// its IFD; the previous IFD's next-offset is patched afterwards.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();

        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        if self.is_bigtiff {
            self.write_u16(&mut data, 43);
            self.write_u16(&mut data, 8);
            self.write_u16(&mut data, 0);
        } else {
            self.write_u16(&mut data, 42);
        }
        let mut next_offset_pos = data.len();
        self.write_offset(&mut data, 0);

        for (index, page) in self.pages.iter().enumerate() {
            let strip = self.encode_strip(page);
            let strip_offset = data.len() as u64;
            data.extend_from_slice(&strip);
            pad_even(&mut data);

            let mut entries = vec![
                self.long_entry(256, page.width),
                self.long_entry(257, page.height),
                self.short_entry(258, &vec![page.bits; page.samples as usize]),
                self.short_entry(259, &[self.compression_code()]),
                self.short_entry(262, &[if page.samples == 3 { 2 } else { 1 }]),
                self.long_entry(273, strip_offset as u32),
                self.short_entry(277, &[page.samples]),
                self.long_entry(278, page.height),
                self.long_entry(279, strip.len() as u32),
            ];
            if index == 0 {
                if let Some(description) = &self.description {
                    let mut payload = description.as_bytes().to_vec();
                    payload.push(0);
                    entries.push(Entry {
                        tag: 270,
                        field_type: 2,
                        count: payload.len() as u64,
                        payload,
                    });
                }
            }
            entries.sort_by_key(|e| e.tag);

            // External payloads go before the IFD
            let inline_size = if self.is_bigtiff { 8 } else { 4 };
            let mut value_offsets = Vec::with_capacity(entries.len());
            for entry in &entries {
                if entry.payload.len() > inline_size {
                    value_offsets.push(Some(data.len() as u64));
                    data.extend_from_slice(&entry.payload);
                    pad_even(&mut data);
                } else {
                    value_offsets.push(None);
                }
            }

            let ifd_offset = data.len() as u64;
            self.patch_offset(&mut data, next_offset_pos, ifd_offset);

            if self.is_bigtiff {
                self.write_u64(&mut data, entries.len() as u64);
            } else {
                self.write_u16(&mut data, entries.len() as u16);
            }
            for (entry, value_offset) in entries.iter().zip(value_offsets) {
                self.write_u16(&mut data, entry.tag);
                self.write_u16(&mut data, entry.field_type);
                if self.is_bigtiff {
                    self.write_u64(&mut data, entry.count);
                } else {
                    self.write_u32(&mut data, entry.count as u32);
                }
                match value_offset {
                    Some(offset) => self.write_offset(&mut data, offset),
                    None => {
                        let mut field = entry.payload.clone();
                        field.resize(inline_size, 0);
                        data.extend_from_slice(&field);
                    }
                }
            }
            next_offset_pos = data.len();
            self.write_offset(&mut data, 0);
        }

        data
    }

    fn compression_code(&self) -> u16 {
        match self.compression {
            StripCompression::None => 1,
            StripCompression::Deflate => 8,
        }
    }

    fn encode_strip(&self, page: &PageSpec) -> Vec<u8> {
        let mut raw = Vec::with_capacity(page.values.len() * (page.bits / 8) as usize);
        for &value in &page.values {
            match page.bits {
                8 => raw.push(value as u8),
                16 => self.write_u16(&mut raw, value as u16),
                _ => unreachable!("unsupported test bit depth"),
            }
        }
        match self.compression {
            StripCompression::None => raw,
            StripCompression::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&raw).unwrap();
                encoder.finish().unwrap()
            }
        }
    }

    fn short_entry(&self, tag: u16, values: &[u16]) -> Entry {
        let mut payload = Vec::new();
        for &v in values {
            self.write_u16(&mut payload, v);
        }
        Entry {
            tag,
            field_type: 3,
            count: values.len() as u64,
            payload,
        }
    }

    fn long_entry(&self, tag: u16, value: u32) -> Entry {
        let mut payload = Vec::new();
        self.write_u32(&mut payload, value);
        Entry {
            tag,
            field_type: 4,
            count: 1,
            payload,
        }
    }

    fn write_offset(&self, data: &mut Vec<u8>, offset: u64) {
        if self.is_bigtiff {
            self.write_u64(data, offset);
        } else {
            self.write_u32(data, offset as u32);
        }
    }

    fn patch_offset(&self, data: &mut [u8], pos: usize, offset: u64) {
        let mut bytes = Vec::new();
        self.write_offset(&mut bytes, offset);
        data[pos..pos + bytes.len()].copy_from_slice(&bytes);
    }

    fn write_u16(&self, data: &mut Vec<u8>, value: u16) {
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend(&value.to_le_bytes()),
            ByteOrderType::BigEndian => data.extend(&value.to_be_bytes()),
        }
    }

    fn write_u32(&self, data: &mut Vec<u8>, value: u32) {
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend(&value.to_le_bytes()),
            ByteOrderType::BigEndian => data.extend(&value.to_be_bytes()),
        }
    }

    fn write_u64(&self, data: &mut Vec<u8>, value: u64) {
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend(&value.to_le_bytes()),
            ByteOrderType::BigEndian => data.extend(&value.to_be_bytes()),
        }
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn pad_even(data: &mut Vec<u8>) {
    if data.len() % 2 == 1 {
        data.push(0);
    }
}

// =============================================================================
// OME-XML
// =============================================================================

/// OME-XML document for one image with `size_c * size_z * size_t` pages in
/// XYZCT order, with named channels, two planes and instrument metadata.
pub fn ome_xml(size_x: usize, size_y: usize, size_z: usize, size_c: usize, size_t: usize) -> String {
    let channels: String = (0..size_c)
        .map(|c| {
            format!(
                r#"<Channel ID="Channel:0:{c}" Name="C{c}" SamplesPerPixel="1" EmissionWavelength="{}" Color="-16776961"/>"#,
                500 + c * 50
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2016-06">
  <Instrument ID="Instrument:0">
    <Microscope Manufacturer="Zeiss" Model="LSM 980" SerialNumber="SN-1"/>
  </Instrument>
  <Image ID="Image:0" Name="Well A1">
    <AcquisitionDate>2023-05-17T09:30:00.250</AcquisitionDate>
    <InstrumentRef ID="Instrument:0"/>
    <ObjectiveSettings ID="Objective:0" Medium="Oil" RefractiveIndex="1.518"/>
    <Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="uint8"
            SizeX="{size_x}" SizeY="{size_y}" SizeZ="{size_z}" SizeC="{size_c}" SizeT="{size_t}"
            PhysicalSizeX="0.5" PhysicalSizeY="0.5" PhysicalSizeZ="2.0">
      {channels}
      <TiffData IFD="0" PlaneCount="{planes}"/>
      <Plane TheZ="0" TheT="0" TheC="0" PositionX="12.5" PositionY="-3.0" ExposureTime="0.1"/>
      <Plane TheZ="1" TheT="0" TheC="0"/>
    </Pixels>
  </Image>
</OME>"#,
        planes = size_c * size_z * size_t,
    )
}
