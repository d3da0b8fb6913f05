//! Decoder adapter for microscopy files.
//!
//! Files are routed by extension ([`detect::route_by_extension`]), opened as
//! TIFF/BigTIFF, and their metadata is taken from embedded OME-XML, an ImageJ
//! description, or synthesized from the page structure.
//!
//! [`ImageFileReader`] exposes the three operations the converter needs:
//! metadata, whole-stack read, and indexed single-plane read.

pub mod detect;
pub mod imagej;
pub mod ome;
pub mod planes;
pub mod reader;
pub mod stack;
pub mod tiff;

pub use detect::{
    check_tiff_signature, file_name, is_tiff_header, route_by_extension, DecodePath,
    PLANE_EXTENSIONS, STACK_EXTENSIONS,
};
pub use ome::parse_ome_xml;
pub use planes::PlaneMap;
pub use reader::{ImageFileReader, MetadataSource};
