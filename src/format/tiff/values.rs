//! TIFF tag value reading.
//!
//! Values live either inline in the IFD entry or at an offset elsewhere in the
//! file. Arrays (strip and tile offsets) are fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values respecting the file's byte order and offset width.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Raw bytes of an entry's value, inline or fetched from the file.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: "value",
            message: format!("value of {} bytes does not fit in memory", size),
        })?;
        let offset = entry.value_offset(self.header);
        Ok(self.reader.read_exact_at(offset, len).await?)
    }

    /// Read an unsigned integer array (Byte, Short, Long, Long8, Ifd, Ifd8).
    ///
    /// `tag` only labels errors.
    pub async fn read_u64_array(
        &self,
        entry: &IfdEntry,
        tag: TiffTag,
    ) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry).await?;
        decode_unsigned(&bytes, entry.count as usize, field_type, self.header.byte_order)
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected an unsigned integer type, got {:?}", field_type),
            })
    }

    /// Read a single unsigned integer value.
    pub async fn read_u64(&self, entry: &IfdEntry, tag: TiffTag) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }

        self.read_u64_array(entry, tag)
            .await?
            .first()
            .copied()
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag.name(),
                message: "expected at least one value".to_string(),
            })
    }

    /// Read an ASCII value, stopping at the first NUL.
    pub async fn read_string(&self, entry: &IfdEntry, tag: TiffTag) -> Result<String, TiffError> {
        match entry.field_type {
            Some(FieldType::Ascii) | Some(FieldType::Byte) | Some(FieldType::Undefined) => {}
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: tag.name(),
                    message: format!("expected Ascii, got {:?}", other),
                })
            }
        }

        let bytes = self.read_bytes(entry).await?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

/// Decode `count` unsigned integers of `field_type` from raw bytes.
///
/// Returns `None` if the type is not an unsigned integer type. Values that
/// would run past the end of `bytes` are dropped.
pub fn decode_unsigned(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Option<Vec<u64>> {
    let width = field_type.size_in_bytes();
    let read: fn(ByteOrder, &[u8]) -> u64 = match field_type {
        FieldType::Byte => |_, b| b[0] as u64,
        FieldType::Short => |o, b| o.read_u16(b) as u64,
        FieldType::Long | FieldType::Ifd => |o, b| o.read_u32(b) as u64,
        FieldType::Long8 | FieldType::Ifd8 => |o, b| o.read_u64(b),
        _ => return None,
    };

    Some(
        bytes
            .chunks_exact(width)
            .take(count)
            .map(|chunk| read(byte_order, chunk))
            .collect(),
    )
}

// =============================================================================
// Tests
// =============================================================================
