//! OME-XML parsing.
//!
//! Elements are matched by local name so documents using any OME schema
//! revision (or none) are accepted. Optional attributes that fail to parse as
//! numbers are treated as absent; required ones are errors.

use roxmltree::{Document, Node};

use crate::error::FormatError;
use crate::metadata::{
    parse_timestamp, Channel, DimensionOrder, ImagingEnvironment, Instrument, Microscope,
    ObjectiveSettings, OmeMetadata, Pixels, Plane, RawImageMetadata, Rgb, TiffData,
    MAX_SERIES_ELEMENTS,
};

/// Marker identifying an OME-XML ImageDescription.
pub const OME_MARKER: &str = "<OME";

/// Whether an ImageDescription carries an OME-XML document.
pub fn is_ome_xml(description: &str) -> bool {
    description.contains(OME_MARKER)
}

/// Parse an OME-XML document into instruments and images.
///
/// # Errors
/// `FormatError::Metadata` if the XML is malformed, the root is not `OME`, or
/// an image lacks required `Pixels` attributes.
pub fn parse_ome_xml(xml: &str) -> Result<OmeMetadata, FormatError> {
    let document = Document::parse(xml.trim_start_matches('\u{feff}')).map_err(|e| {
        FormatError::Metadata {
            message: format!("invalid OME-XML: {}", e),
        }
    })?;

    let root = document.root_element();
    if root.tag_name().name() != "OME" {
        return Err(metadata_error(format!(
            "expected <OME> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let instruments = children(root, "Instrument").map(parse_instrument).collect();
    let images = children(root, "Image")
        .enumerate()
        .map(|(index, node)| parse_image(node, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OmeMetadata {
        instruments,
        images,
    })
}

fn parse_instrument(node: Node<'_, '_>) -> Instrument {
    Instrument {
        id: node.attribute("ID").unwrap_or_default().to_string(),
        microscope: child(node, "Microscope").map(|m| Microscope {
            manufacturer: string_attr(m, "Manufacturer"),
            model: string_attr(m, "Model"),
            serial_number: string_attr(m, "SerialNumber"),
            lot_number: string_attr(m, "LotNumber"),
        }),
    }
}

fn parse_image(node: Node<'_, '_>, index: usize) -> Result<RawImageMetadata, FormatError> {
    let id = node
        .attribute("ID")
        .map(str::to_string)
        .unwrap_or_else(|| format!("Image:{}", index));

    let pixels_node = child(node, "Pixels")
        .ok_or_else(|| metadata_error(format!("missing <Pixels> in image {}", id)))?;

    Ok(RawImageMetadata {
        name: string_attr(node, "Name"),
        acquisition_date: child(node, "AcquisitionDate")
            .and_then(|n| n.text())
            .and_then(parse_timestamp),
        instrument_ref: child(node, "InstrumentRef").and_then(|n| string_attr(n, "ID")),
        objective_settings: child(node, "ObjectiveSettings").map(|n| ObjectiveSettings {
            id: string_attr(n, "ID"),
            correction_collar: f64_attr(n, "CorrectionCollar"),
            medium: string_attr(n, "Medium"),
            refractive_index: f64_attr(n, "RefractiveIndex"),
        }),
        imaging_environment: child(node, "ImagingEnvironment").map(|n| ImagingEnvironment {
            air_pressure: f64_attr(n, "AirPressure"),
            co2_percent: f64_attr(n, "CO2Percent"),
            humidity: f64_attr(n, "Humidity"),
            temperature: f64_attr(n, "Temperature"),
        }),
        pixels: parse_pixels(pixels_node, &id)?,
        id,
    })
}

fn parse_pixels(node: Node<'_, '_>, image_id: &str) -> Result<Pixels, FormatError> {
    let size = |name: &str| -> Result<usize, FormatError> {
        let value = node.attribute(name).ok_or_else(|| {
            metadata_error(format!("missing {} on <Pixels> of image {}", name, image_id))
        })?;
        value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                metadata_error(format!(
                    "invalid {} '{}' on <Pixels> of image {}; expected a positive integer",
                    name, value, image_id
                ))
            })
    };

    let dimension_order = match node.attribute("DimensionOrder") {
        Some(raw) => DimensionOrder::parse(raw.trim()).ok_or_else(|| {
            metadata_error(format!("unknown DimensionOrder '{}' in image {}", raw, image_id))
        })?,
        None => DimensionOrder::XYZCT,
    };

    let pixels = Pixels {
        dimension_order,
        size_x: size("SizeX")?,
        size_y: size("SizeY")?,
        size_z: size("SizeZ")?,
        size_c: size("SizeC")?,
        size_t: size("SizeT")?,
        physical_size_x: f64_attr(node, "PhysicalSizeX"),
        physical_size_y: f64_attr(node, "PhysicalSizeY"),
        physical_size_z: f64_attr(node, "PhysicalSizeZ"),
        channels: children(node, "Channel").map(parse_channel).collect(),
        planes: children(node, "Plane").map(parse_plane).collect(),
        tiff_data: children(node, "TiffData").map(parse_tiff_data).collect(),
    };
    check_element_count(&pixels, image_id)?;
    Ok(pixels)
}

/// Reject a series whose declared sizes exceed [`MAX_SERIES_ELEMENTS`].
pub fn check_element_count(pixels: &Pixels, image_id: &str) -> Result<usize, FormatError> {
    pixels.element_count().ok_or_else(|| {
        metadata_error(format!(
            "image {} declares {}x{}x{}x{}x{} (CTZXY) samples, more than the {} allowed",
            image_id,
            pixels.size_c,
            pixels.size_t,
            pixels.size_z,
            pixels.size_x,
            pixels.size_y,
            MAX_SERIES_ELEMENTS
        ))
    })
}

fn parse_channel(node: Node<'_, '_>) -> Channel {
    Channel {
        id: string_attr(node, "ID"),
        name: string_attr(node, "Name"),
        samples_per_pixel: usize_attr(node, "SamplesPerPixel"),
        emission_wavelength: f64_attr(node, "EmissionWavelength"),
        excitation_wavelength: f64_attr(node, "ExcitationWavelength"),
        acquisition_mode: string_attr(node, "AcquisitionMode"),
        color: node
            .attribute("Color")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .map(Rgb::from_rgba_i32),
    }
}

fn parse_plane(node: Node<'_, '_>) -> Plane {
    Plane {
        the_z: usize_attr(node, "TheZ").unwrap_or(0),
        the_t: usize_attr(node, "TheT").unwrap_or(0),
        the_c: usize_attr(node, "TheC").unwrap_or(0),
        exposure_time: f64_attr(node, "ExposureTime"),
        delta_t: f64_attr(node, "DeltaT"),
        position_x: f64_attr(node, "PositionX"),
        position_y: f64_attr(node, "PositionY"),
        position_z: f64_attr(node, "PositionZ"),
    }
}

fn parse_tiff_data(node: Node<'_, '_>) -> TiffData {
    TiffData {
        ifd: usize_attr(node, "IFD"),
        first_c: usize_attr(node, "FirstC").unwrap_or(0),
        first_z: usize_attr(node, "FirstZ").unwrap_or(0),
        first_t: usize_attr(node, "FirstT").unwrap_or(0),
        plane_count: usize_attr(node, "PlaneCount"),
    }
}

// =============================================================================
// Node helpers
// =============================================================================

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input: 'a>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(node, name).next()
}

fn string_attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn f64_attr(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name)?.trim().parse::<f64>().ok()
}

fn usize_attr(node: Node<'_, '_>, name: &str) -> Option<usize> {
    node.attribute(name)?.trim().parse::<usize>().ok()
}

fn metadata_error(message: String) -> FormatError {
    FormatError::Metadata { message }
}
