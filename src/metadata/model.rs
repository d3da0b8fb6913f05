use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

// =============================================================================
// File-level metadata
// =============================================================================

/// Decoded metadata of one input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OmeMetadata {
    /// Instruments in document order
    pub instruments: Vec<Instrument>,

    /// One entry per series, in series order
    pub images: Vec<RawImageMetadata>,
}

/// A microscope setup referenced by images.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Instrument {
    /// Identifier, may be empty in malformed documents
    pub id: String,
    pub microscope: Option<Microscope>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Microscope {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub lot_number: Option<String>,
}

// =============================================================================
// Per-series metadata
// =============================================================================

/// Metadata of one series (image) before mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawImageMetadata {
    pub id: String,
    pub name: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    /// ID of the referenced [`Instrument`]
    pub instrument_ref: Option<String>,
    pub objective_settings: Option<ObjectiveSettings>,
    pub imaging_environment: Option<ImagingEnvironment>,
    pub pixels: Pixels,
}

/// Dimensions, physical sizes, channels and planes of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pixels {
    pub dimension_order: DimensionOrder,
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    /// Includes samples: an RGB image has `size_c == 3` and one channel
    pub size_c: usize,
    pub size_t: usize,
    pub physical_size_x: Option<f64>,
    pub physical_size_y: Option<f64>,
    pub physical_size_z: Option<f64>,
    pub channels: Vec<Channel>,
    pub planes: Vec<Plane>,
    pub tiff_data: Vec<TiffData>,
}

/// Largest number of samples a single series may hold once normalized.
///
/// 2^31 `f64` values, 16 GiB. Declared sizes above this are rejected
/// before any buffer is allocated.
pub const MAX_SERIES_ELEMENTS: usize = 1 << 31;

impl Default for Pixels {
    fn default() -> Self {
        Self {
            dimension_order: DimensionOrder::XYZCT,
            size_x: 1,
            size_y: 1,
            size_z: 1,
            size_c: 1,
            size_t: 1,
            physical_size_x: None,
            physical_size_y: None,
            physical_size_z: None,
            channels: Vec::new(),
            planes: Vec::new(),
            tiff_data: Vec::new(),
        }
    }
}

impl Pixels {
    /// Number of stored channels once samples are folded in.
    ///
    /// Falls back to `size_c` when the channel list does not divide it.
    pub fn effective_size_c(&self) -> usize {
        let declared = self.channels.len();
        if declared > 0 && self.size_c % declared == 0 {
            declared
        } else {
            self.size_c.max(1)
        }
    }

    /// Samples stored per channel plane (3 for an RGB channel).
    pub fn samples_per_channel(&self) -> usize {
        (self.size_c / self.effective_size_c()).max(1)
    }

    /// Number of 2-D planes making up this series.
    pub fn plane_count(&self) -> usize {
        self.effective_size_c()
            .saturating_mul(self.size_z.max(1))
            .saturating_mul(self.size_t.max(1))
    }

    /// Samples in the full `(C, T, Z, X, Y)` array, or `None` when the
    /// product overflows or exceeds [`MAX_SERIES_ELEMENTS`].
    pub fn element_count(&self) -> Option<usize> {
        checked_elements(&[
            self.size_c,
            self.size_t,
            self.size_z,
            self.size_x,
            self.size_y,
        ])
    }
}

/// Product of `dims` bounded by [`MAX_SERIES_ELEMENTS`].
pub fn checked_elements(dims: &[usize]) -> Option<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d.max(1)))
        .filter(|&n| n <= MAX_SERIES_ELEMENTS)
}

/// A single 2-D plane at `(z, t, c)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plane {
    pub the_z: usize,
    pub the_t: usize,
    pub the_c: usize,
    pub exposure_time: Option<f64>,
    pub delta_t: Option<f64>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub position_z: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Channel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub samples_per_pixel: Option<usize>,
    pub emission_wavelength: Option<f64>,
    pub excitation_wavelength: Option<f64>,
    /// OME acquisition mode tag, e.g. `WideField`
    pub acquisition_mode: Option<String>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectiveSettings {
    pub id: Option<String>,
    pub correction_collar: Option<f64>,
    /// OME medium tag, e.g. `Oil`
    pub medium: Option<String>,
    pub refractive_index: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImagingEnvironment {
    pub air_pressure: Option<f64>,
    pub co2_percent: Option<f64>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
}

/// Link from a run of planes to the IFDs holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TiffData {
    pub ifd: Option<usize>,
    pub first_c: usize,
    pub first_z: usize,
    pub first_t: usize,
    pub plane_count: Option<usize>,
}

// =============================================================================
// Value types
// =============================================================================

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Decode an OME color: a signed 32-bit integer packing `RRGGBBAA`.
    pub fn from_rgba_i32(value: i32) -> Self {
        let [r, g, b, _a] = (value as u32).to_be_bytes();
        Rgb { r, g, b }
    }

    pub fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// Axis name within a plane-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaneAxis {
    C,
    Z,
    T,
}

/// Order in which planes are laid out; X and Y always come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum DimensionOrder {
    XYZCT,
    XYZTC,
    XYCTZ,
    XYCZT,
    XYTCZ,
    XYTZC,
}

impl DimensionOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "XYZCT" => Some(DimensionOrder::XYZCT),
            "XYZTC" => Some(DimensionOrder::XYZTC),
            "XYCTZ" => Some(DimensionOrder::XYCTZ),
            "XYCZT" => Some(DimensionOrder::XYCZT),
            "XYTCZ" => Some(DimensionOrder::XYTCZ),
            "XYTZC" => Some(DimensionOrder::XYTZC),
            _ => None,
        }
    }

    /// Plane axes from fastest to slowest varying.
    pub fn axes(self) -> [PlaneAxis; 3] {
        use PlaneAxis::{C, T, Z};
        match self {
            DimensionOrder::XYZCT => [Z, C, T],
            DimensionOrder::XYZTC => [Z, T, C],
            DimensionOrder::XYCTZ => [C, T, Z],
            DimensionOrder::XYCZT => [C, Z, T],
            DimensionOrder::XYTCZ => [T, C, Z],
            DimensionOrder::XYTZC => [T, Z, C],
        }
    }

    /// Linear plane index of `(c, z, t)` given effective sizes.
    pub fn plane_index(self, c: usize, z: usize, t: usize, sizes: PlaneSizes) -> usize {
        let [fast, mid, slow] = self.axes();
        let coord = |axis: PlaneAxis| match axis {
            PlaneAxis::C => c,
            PlaneAxis::Z => z,
            PlaneAxis::T => t,
        };
        coord(fast) + sizes.get(fast) * (coord(mid) + sizes.get(mid) * coord(slow))
    }

    /// Inverse of [`DimensionOrder::plane_index`]: `(c, z, t)` of a plane.
    pub fn plane_coords(self, index: usize, sizes: PlaneSizes) -> (usize, usize, usize) {
        let [fast, mid, slow] = self.axes();
        let fast_len = sizes.get(fast).max(1);
        let mid_len = sizes.get(mid).max(1);
        let values = [
            (fast, index % fast_len),
            (mid, (index / fast_len) % mid_len),
            (slow, index / (fast_len * mid_len)),
        ];
        let pick = |axis: PlaneAxis| {
            values
                .iter()
                .find(|(a, _)| *a == axis)
                .map(|(_, v)| *v)
                .unwrap_or(0)
        };
        (pick(PlaneAxis::C), pick(PlaneAxis::Z), pick(PlaneAxis::T))
    }
}

/// Effective plane-grid sizes (channels counted without samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSizes {
    pub c: usize,
    pub z: usize,
    pub t: usize,
}

impl PlaneSizes {
    pub fn of(pixels: &Pixels) -> Self {
        Self {
            c: pixels.effective_size_c(),
            z: pixels.size_z.max(1),
            t: pixels.size_t.max(1),
        }
    }

    pub fn get(self, axis: PlaneAxis) -> usize {
        match axis {
            PlaneAxis::C => self.c,
            PlaneAxis::Z => self.z,
            PlaneAxis::T => self.t,
        }
    }

    pub fn total(self) -> usize {
        self.c.saturating_mul(self.z).saturating_mul(self.t)
    }
}

/// Parse an acquisition timestamp.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.f]`, the latter read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
