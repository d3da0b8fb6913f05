//! Format routing for input files.
//!
//! Every input is routed by its file extension before anything is read:
//!
//! - **Simple stack**: `.stk`, `.tif`, `.tiff`, `.TIF` (exact, case-sensitive).
//!   The whole file is read as one dense array and only padded to 5-D.
//! - **Plane indexed**: `.btf`, `.tf2`, `.tf8` and other spellings of
//!   `.tif`/`.tiff` (case-insensitive). Planes are fetched one at a time by
//!   `(c, z, t, series)`.
//!
//! Anything else is rejected with `FormatError::UnsupportedFormat`, which maps
//! to HTTP 415 Unsupported Media Type.

use crate::error::FormatError;
use crate::io::RangeReader;

use super::tiff::TiffHeader;

// =============================================================================
// DecodePath
// =============================================================================

/// Which decoder path a file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePath {
    /// Whole-file read, then left-padding to 5 dimensions
    SimpleStack,

    /// Plane-by-plane read into a pre-allocated 5-D buffer
    PlaneIndexed,
}

impl DecodePath {
    pub const fn name(&self) -> &'static str {
        match self {
            DecodePath::SimpleStack => "simple stack",
            DecodePath::PlaneIndexed => "plane indexed",
        }
    }
}

/// Extensions read as a whole stack (exact match).
pub const STACK_EXTENSIONS: &[&str] = &[".stk", ".tif", ".tiff", ".TIF"];

/// Extensions read plane by plane (matched case-insensitively).
pub const PLANE_EXTENSIONS: &[&str] = &[".btf", ".tf2", ".tf8", ".tif", ".tiff"];

// =============================================================================
// Routing
// =============================================================================

/// Route a file location (path, key or URI) to its decoder path.
///
/// # Errors
/// `FormatError::UnsupportedFormat` for extensions outside the TIFF family.
pub fn route_by_extension(location: &str) -> Result<DecodePath, FormatError> {
    let name = file_name(location);

    if STACK_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return Ok(DecodePath::SimpleStack);
    }

    let lower = name.to_ascii_lowercase();
    if PLANE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Ok(DecodePath::PlaneIndexed);
    }

    Err(FormatError::UnsupportedFormat {
        reason: format!("no decoder for '{}'; conversion of this format is not implemented", name),
    })
}

/// Last path segment of a local path, object key or URI.
pub fn file_name(location: &str) -> &str {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Check that the file starts with a TIFF or BigTIFF header.
///
/// # Errors
/// `FormatError::UnsupportedFormat` if the signature is missing.
pub async fn check_tiff_signature<R: RangeReader>(reader: &R) -> Result<(), FormatError> {
    let len = reader.size().min(4) as usize;
    let bytes = reader.read_exact_at(0, len).await?;
    if !is_tiff_header(&bytes) {
        return Err(FormatError::UnsupportedFormat {
            reason: format!("{} is not a TIFF file", reader.identifier()),
        });
    }
    Ok(())
}

/// Quick check for TIFF/BigTIFF magic bytes.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    TiffHeader::sniff(bytes)
}

// =============================================================================
// Tests
// =============================================================================
