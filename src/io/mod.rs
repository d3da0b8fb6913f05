//! Byte-level access to input files.
//!
//! Everything above this layer talks to a [`RangeReader`]; the concrete
//! reader is picked by [`crate::source::StorageFileSource`] from the file
//! location.

mod local_reader;
mod range_reader;
mod s3_reader;

pub use local_reader::LocalFileReader;
pub use range_reader::{
    check_range, read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le,
    RangeReader,
};
pub use s3_reader::{create_s3_client, parse_s3_uri, S3RangeReader, DEFAULT_S3_REGION};
