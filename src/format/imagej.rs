//! ImageJ hyperstack descriptions and metadata synthesis for non-OME TIFFs.
//!
//! ImageJ writes a `key=value` description on the first page, e.g.
//!
//! ```text
//! ImageJ=1.54f
//! images=30
//! channels=2
//! slices=5
//! frames=3
//! hyperstack=true
//! ```
//!
//! Pages are stored with channels varying fastest, then slices, then frames
//! (XYCZT). Plain multi-page TIFFs carry no such header and are read as a
//! Z stack.

use crate::error::FormatError;
use crate::metadata::{
    checked_elements, Channel, DimensionOrder, OmeMetadata, Pixels, Plane, PlaneSizes,
    RawImageMetadata, MAX_SERIES_ELEMENTS,
};

/// Marker at the start of every ImageJ description.
const IMAGEJ_MARKER: &str = "ImageJ=";

/// Hyperstack dimensions from an ImageJ description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageJInfo {
    pub images: Option<usize>,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

/// Parse an ImageJ description, `None` if it is not one.
pub fn parse_imagej_description(description: &str) -> Option<ImageJInfo> {
    if !description.trim_start().starts_with(IMAGEJ_MARKER) {
        return None;
    }

    let mut info = ImageJInfo {
        images: None,
        channels: 1,
        slices: 1,
        frames: 1,
    };
    for line in description.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<usize>() else {
            continue;
        };
        match key.trim() {
            "images" => info.images = Some(value),
            "channels" => info.channels = value.max(1),
            "slices" => info.slices = value.max(1),
            "frames" => info.frames = value.max(1),
            _ => {}
        }
    }

    // A bare stack of N images has no slices key
    if let Some(images) = info.images {
        if info.channels * info.slices * info.frames == 1 && images > 1 {
            info.slices = images;
        }
    }

    Some(info)
}

/// Page geometry needed to synthesize metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
}

/// Build single-series metadata for a TIFF without OME-XML.
///
/// ImageJ hyperstacks use their declared channels, slices and frames when
/// they match the page count; everything else maps pages to Z. Samples per
/// pixel multiply into `size_c`, one channel per stored plane group.
///
/// # Errors
/// `FormatError::Metadata` when the resulting series would hold more than
/// [`MAX_SERIES_ELEMENTS`] samples.
pub fn synthesize_metadata(
    name: &str,
    page_count: usize,
    geometry: PageGeometry,
    imagej: Option<ImageJInfo>,
) -> Result<OmeMetadata, FormatError> {
    let (channels, slices, frames, order) = match imagej {
        Some(info)
            if checked_elements(&[info.channels, info.slices, info.frames])
                == Some(page_count) =>
        (
            info.channels,
            info.slices,
            info.frames,
            DimensionOrder::XYCZT,
        ),
        _ => (1, page_count.max(1), 1, DimensionOrder::XYZCT),
    };

    let samples = geometry.samples_per_pixel.max(1);
    let dims = [channels, samples, slices, frames, geometry.width, geometry.height];
    if checked_elements(&dims).is_none() {
        return Err(FormatError::Metadata {
            message: format!(
                "{} holds {} pages of {}x{}x{} samples, more than the {} allowed",
                name,
                page_count,
                geometry.width,
                geometry.height,
                samples,
                MAX_SERIES_ELEMENTS
            ),
        });
    }

    let sizes = PlaneSizes {
        c: channels,
        z: slices,
        t: frames,
    };
    let pixels = Pixels {
        dimension_order: order,
        size_x: geometry.width,
        size_y: geometry.height,
        size_z: slices,
        size_c: channels * samples,
        size_t: frames,
        channels: (0..channels)
            .map(|_| Channel {
                samples_per_pixel: Some(samples),
                ..Default::default()
            })
            .collect(),
        planes: (0..sizes.total())
            .map(|index| {
                let (c, z, t) = order.plane_coords(index, sizes);
                Plane {
                    the_c: c,
                    the_z: z,
                    the_t: t,
                    ..Default::default()
                }
            })
            .collect(),
        ..Default::default()
    };

    Ok(OmeMetadata {
        instruments: Vec::new(),
        images: vec![RawImageMetadata {
            id: "Image:0".to_string(),
            name: Some(name.to_string()),
            pixels,
            ..Default::default()
        }],
    })
}
