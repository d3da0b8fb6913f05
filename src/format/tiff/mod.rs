//! TIFF and BigTIFF decoding for microscopy stacks.
//!
//! - **Byte order**: declared in the header (II or MM); every multi-byte value
//!   is read respecting it.
//!
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled
//!   transparently.
//!
//! - **Pages**: each IFD is one 2-D page (optionally with several samples per
//!   pixel). Multi-dimensional stacks are sequences of pages whose meaning is
//!   given by the OME-XML or ImageJ description of the first page.
//!
//! - **Pixel data**: strips or tiles, uncompressed, Deflate or PackBits,
//!   integer or floating point samples, all decoded to `f64`.

mod file;
mod parser;
mod pixels;
mod tags;
mod values;

pub use file::TiffFile;
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pixels::{decode_samples, decompress, read_page, PageLayout, SampleKind};
pub use tags::{Compression, FieldType, TiffTag};
pub use values::{decode_unsigned, ValueReader};
