//! Pixel data decoding.
//!
//! A page is stored as a grid of chunks (strips or tiles). Each chunk is read
//! with one range request, decompressed, converted to `f64` samples and
//! copied into its place in the page. With planar configuration 2 the grid is
//! repeated once per sample.

use std::io::Read;

use flate2::read::ZlibDecoder;
use ndarray::{ArrayD, IxDyn};

use crate::error::TiffError;
use crate::io::RangeReader;
use crate::metadata::{checked_elements, MAX_SERIES_ELEMENTS};

use super::parser::{ByteOrder, Ifd};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Sample interpretation
// =============================================================================

/// How the bits of one sample are interpreted (SampleFormat tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Unsigned,
    Signed,
    Float,
}

impl SampleKind {
    fn from_tag(value: u64) -> Option<Self> {
        match value {
            // 4 is "undefined"; treat the bits as unsigned
            1 | 4 => Some(SampleKind::Unsigned),
            2 => Some(SampleKind::Signed),
            3 => Some(SampleKind::Float),
            _ => None,
        }
    }

    fn tag_value(self) -> u16 {
        match self {
            SampleKind::Unsigned => 1,
            SampleKind::Signed => 2,
            SampleKind::Float => 3,
        }
    }
}

// =============================================================================
// PageLayout
// =============================================================================

/// Everything needed to decode the pixels of one IFD.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub bits_per_sample: u16,
    pub sample_kind: SampleKind,
    pub compression: Compression,
    /// PlanarConfiguration == 2
    pub planar_separate: bool,
    pub chunk_width: usize,
    pub chunk_height: usize,
    pub chunk_offsets: Vec<u64>,
    pub chunk_byte_counts: Vec<u64>,
}

impl PageLayout {
    /// Read the layout of a page from its IFD.
    ///
    /// # Errors
    /// - `MissingTag` for absent dimensions or chunk offsets
    /// - `UnsupportedCompression`, `UnsupportedPredictor`,
    ///   `UnsupportedSampleFormat` for encodings this decoder cannot handle
    /// - `InvalidTagValue` for inconsistent chunk tables
    pub async fn from_ifd<R: RangeReader>(
        ifd: &Ifd,
        values: &ValueReader<'_, R>,
    ) -> Result<Self, TiffError> {
        let width = required_u64(ifd, values, TiffTag::ImageWidth).await? as usize;
        let height = required_u64(ifd, values, TiffTag::ImageLength).await? as usize;
        let samples_per_pixel =
            optional_u64(ifd, values, TiffTag::SamplesPerPixel).await?.unwrap_or(1).max(1) as usize;
        check_page_size(TiffTag::ImageWidth.name(), width, height, samples_per_pixel)?;

        let compression_code = optional_u64(ifd, values, TiffTag::Compression)
            .await?
            .unwrap_or(1) as u16;
        let compression = match Compression::from_u16(compression_code) {
            Some(c) if c.is_supported() => c,
            Some(c) => return Err(TiffError::UnsupportedCompression(c.name().to_string())),
            None => {
                return Err(TiffError::UnsupportedCompression(format!(
                    "code {}",
                    compression_code
                )))
            }
        };

        let predictor = optional_u64(ifd, values, TiffTag::Predictor).await?.unwrap_or(1) as u16;
        if predictor != 1 {
            return Err(TiffError::UnsupportedPredictor(predictor));
        }

        let (bits_per_sample, sample_kind) = sample_format(ifd, values).await?;

        let planar_separate = samples_per_pixel > 1
            && optional_u64(ifd, values, TiffTag::PlanarConfiguration)
                .await?
                .unwrap_or(1)
                == 2;

        let tiled = ifd.get_entry(TiffTag::TileWidth).is_some();
        let (chunk_width, chunk_height, offsets_tag, counts_tag) = if tiled {
            (
                required_u64(ifd, values, TiffTag::TileWidth).await? as usize,
                required_u64(ifd, values, TiffTag::TileLength).await? as usize,
                TiffTag::TileOffsets,
                TiffTag::TileByteCounts,
            )
        } else {
            let rows = optional_u64(ifd, values, TiffTag::RowsPerStrip)
                .await?
                .unwrap_or(height as u64)
                .min(height as u64) as usize;
            (width, rows, TiffTag::StripOffsets, TiffTag::StripByteCounts)
        };

        if chunk_width == 0 || chunk_height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: if tiled { "TileWidth" } else { "RowsPerStrip" },
                message: "chunk dimensions must be non-zero".to_string(),
            });
        }
        if tiled {
            check_page_size("TileWidth", chunk_width, chunk_height, samples_per_pixel)?;
        }

        let offsets_entry = ifd
            .get_entry(offsets_tag)
            .ok_or(TiffError::MissingTag(offsets_tag.name()))?;
        let chunk_offsets = values.read_u64_array(offsets_entry, offsets_tag).await?;

        let mut layout = PageLayout {
            width,
            height,
            samples_per_pixel,
            bits_per_sample,
            sample_kind,
            compression,
            planar_separate,
            chunk_width,
            chunk_height,
            chunk_offsets,
            chunk_byte_counts: Vec::new(),
        };

        layout.chunk_byte_counts = match ifd.get_entry(counts_tag) {
            Some(entry) => values.read_u64_array(entry, counts_tag).await?,
            // Uncompressed files may omit byte counts
            None if compression == Compression::None => {
                vec![layout.chunk_len_bytes() as u64; layout.chunk_offsets.len()]
            }
            None => return Err(TiffError::MissingTag(counts_tag.name())),
        };

        let expected = layout.chunk_count();
        if layout.chunk_offsets.len() < expected || layout.chunk_byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: offsets_tag.name(),
                message: format!(
                    "expected {} chunks, found {} offsets and {} byte counts",
                    expected,
                    layout.chunk_offsets.len(),
                    layout.chunk_byte_counts.len()
                ),
            });
        }

        Ok(layout)
    }

    /// Decoded shape: `[height, width]` or `[height, width, samples]`.
    pub fn shape(&self) -> Vec<usize> {
        if self.samples_per_pixel > 1 {
            vec![self.height, self.width, self.samples_per_pixel]
        } else {
            vec![self.height, self.width]
        }
    }

    fn chunks_across(&self) -> usize {
        self.width.div_ceil(self.chunk_width)
    }

    fn chunks_down(&self) -> usize {
        self.height.div_ceil(self.chunk_height)
    }

    fn samples_per_chunk_pixel(&self) -> usize {
        if self.planar_separate {
            1
        } else {
            self.samples_per_pixel
        }
    }

    fn chunk_count(&self) -> usize {
        let planes = if self.planar_separate {
            self.samples_per_pixel
        } else {
            1
        };
        self.chunks_across() * self.chunks_down() * planes
    }

    fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// Size of a fully populated, decompressed chunk.
    fn chunk_len_bytes(&self) -> usize {
        self.chunk_width * self.chunk_height * self.samples_per_chunk_pixel() * self.bytes_per_sample()
    }
}

async fn optional_u64<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
    tag: TiffTag,
) -> Result<Option<u64>, TiffError> {
    match ifd.get_entry(tag) {
        Some(entry) => values.read_u64(entry, tag).await.map(Some),
        None => Ok(None),
    }
}

async fn required_u64<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
    tag: TiffTag,
) -> Result<u64, TiffError> {
    optional_u64(ifd, values, tag)
        .await?
        .ok_or(TiffError::MissingTag(tag.name()))
}

async fn sample_format<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
) -> Result<(u16, SampleKind), TiffError> {
    let bits = match ifd.get_entry(TiffTag::BitsPerSample) {
        Some(entry) => values.read_u64_array(entry, TiffTag::BitsPerSample).await?,
        None => vec![1],
    };
    let first_bits = bits.first().copied().unwrap_or(1);
    if bits.iter().any(|&b| b != first_bits) {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::BitsPerSample.name(),
            message: format!("mixed bit depths {:?}", bits),
        });
    }

    let format_code = match ifd.get_entry(TiffTag::SampleFormat) {
        Some(entry) => values
            .read_u64_array(entry, TiffTag::SampleFormat)
            .await?
            .first()
            .copied()
            .unwrap_or(1),
        None => 1,
    };

    let bits = first_bits as u16;
    let unsupported = TiffError::UnsupportedSampleFormat {
        bits,
        format: format_code as u16,
    };
    let kind = SampleKind::from_tag(format_code).ok_or_else(|| unsupported.clone())?;
    let valid = match kind {
        SampleKind::Unsigned | SampleKind::Signed => matches!(bits, 8 | 16 | 32 | 64),
        SampleKind::Float => matches!(bits, 32 | 64),
    };
    if !valid {
        return Err(unsupported);
    }

    Ok((bits, kind))
}

/// Samples in a `width` x `height` x `samples_per_pixel` region.
///
/// Fails when the product overflows or exceeds [`MAX_SERIES_ELEMENTS`].
fn check_page_size(
    tag: &'static str,
    width: usize,
    height: usize,
    samples_per_pixel: usize,
) -> Result<usize, TiffError> {
    checked_elements(&[width, height, samples_per_pixel]).ok_or_else(|| {
        TiffError::InvalidTagValue {
            tag,
            message: format!(
                "{}x{}x{} samples exceeds the limit of {}",
                width, height, samples_per_pixel, MAX_SERIES_ELEMENTS
            ),
        }
    })
}

// =============================================================================
// Decoding
// =============================================================================

/// Read and decode one page into an `f64` array of `layout.shape()`.
pub async fn read_page<R: RangeReader>(
    reader: &R,
    layout: &PageLayout,
    byte_order: ByteOrder,
) -> Result<ArrayD<f64>, TiffError> {
    let spp = layout.samples_per_pixel;
    let chunk_spp = layout.samples_per_chunk_pixel();
    let across = layout.chunks_across();
    let per_plane = across * layout.chunks_down();
    let mut out = vec![0.0f64; layout.height * layout.width * spp];

    for index in 0..layout.chunk_count() {
        let offset = layout.chunk_offsets[index];
        let byte_count = layout.chunk_byte_counts[index] as usize;
        if byte_count == 0 {
            // Sparse chunk, stays zero
            continue;
        }

        let raw = reader.read_exact_at(offset, byte_count).await?;
        let decoded = decompress(layout.compression, &raw, layout.chunk_len_bytes())?;
        let samples = decode_samples(
            &decoded,
            layout.bits_per_sample,
            layout.sample_kind,
            byte_order,
        )?;

        let sample_plane = index / per_plane;
        let grid = index % per_plane;
        let x0 = (grid % across) * layout.chunk_width;
        let y0 = (grid / across) * layout.chunk_height;

        for row in 0..layout.chunk_height {
            let y = y0 + row;
            if y >= layout.height {
                break;
            }
            for col in 0..layout.chunk_width {
                let x = x0 + col;
                if x >= layout.width {
                    break;
                }
                let src = (row * layout.chunk_width + col) * chunk_spp;
                let dst = (y * layout.width + x) * spp;
                if layout.planar_separate {
                    if let Some(&v) = samples.get(src) {
                        out[dst + sample_plane] = v;
                    }
                } else {
                    for s in 0..spp {
                        if let Some(&v) = samples.get(src + s) {
                            out[dst + s] = v;
                        }
                    }
                }
            }
        }
    }

    ArrayD::from_shape_vec(IxDyn(&layout.shape()), out).map_err(|e| {
        TiffError::InvalidTagValue {
            tag: TiffTag::ImageWidth.name(),
            message: e.to_string(),
        }
    })
}

/// Decompress one chunk.
///
/// `expected_len` bounds the output; truncated strips are returned short.
pub fn decompress(
    compression: Compression,
    data: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, TiffError> {
    let mut out = match compression {
        Compression::None => data.to_vec(),
        Compression::Deflate | Compression::AdobeDeflate => {
            let mut buf = Vec::with_capacity(expected_len);
            ZlibDecoder::new(data)
                .read_to_end(&mut buf)
                .map_err(|e| TiffError::Decompression(e.to_string()))?;
            buf
        }
        Compression::PackBits => unpack_bits(data, expected_len),
        other => return Err(TiffError::UnsupportedCompression(other.name().to_string())),
    };
    out.truncate(expected_len);
    Ok(out)
}

/// PackBits run-length decoding.
fn unpack_bits(data: &[u8], expected_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0;
    while i < data.len() && out.len() < expected_len {
        let n = data[i] as i8;
        i += 1;
        if n >= 0 {
            let len = n as usize + 1;
            let end = (i + len).min(data.len());
            out.extend_from_slice(&data[i..end]);
            i = end;
        } else if n != -128 {
            let Some(&byte) = data.get(i) else { break };
            out.extend(std::iter::repeat(byte).take((1 - n as isize) as usize));
            i += 1;
        }
    }
    out
}

/// Convert raw sample bytes to `f64`.
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn decode_samples(
    bytes: &[u8],
    bits: u16,
    kind: SampleKind,
    byte_order: ByteOrder,
) -> Result<Vec<f64>, TiffError> {
    let width = (bits / 8) as usize;
    let chunks = bytes.chunks_exact(width.max(1));
    let samples = match (kind, bits) {
        (SampleKind::Unsigned, 8) => bytes.iter().map(|&b| b as f64).collect(),
        (SampleKind::Signed, 8) => bytes.iter().map(|&b| b as i8 as f64).collect(),
        (SampleKind::Unsigned, 16) => chunks.map(|c| byte_order.read_u16(c) as f64).collect(),
        (SampleKind::Signed, 16) => chunks.map(|c| byte_order.read_u16(c) as i16 as f64).collect(),
        (SampleKind::Unsigned, 32) => chunks.map(|c| byte_order.read_u32(c) as f64).collect(),
        (SampleKind::Signed, 32) => chunks.map(|c| byte_order.read_u32(c) as i32 as f64).collect(),
        (SampleKind::Unsigned, 64) => chunks.map(|c| byte_order.read_u64(c) as f64).collect(),
        (SampleKind::Signed, 64) => chunks.map(|c| byte_order.read_u64(c) as i64 as f64).collect(),
        (SampleKind::Float, 32) => chunks
            .map(|c| f32::from_bits(byte_order.read_u32(c)) as f64)
            .collect(),
        (SampleKind::Float, 64) => chunks
            .map(|c| f64::from_bits(byte_order.read_u64(c)))
            .collect(),
        _ => {
            return Err(TiffError::UnsupportedSampleFormat {
                bits,
                format: kind.tag_value(),
            })
        }
    };
    Ok(samples)
}

// =============================================================================
// Tests
// =============================================================================
