//! Wire records accepted by the data-management service.
//!
//! Field names are serialized in camelCase to match the remote schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedArray;

// =============================================================================
// Entity inputs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInput {
    pub name: String,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Stage position; near-equal positions are merged remotely within `tolerance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInput {
    /// ID of the stage the position belongs to
    pub stage: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub tolerance: Option<f64>,
}

/// Timepoint relative to an era start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimepointInput {
    /// ID of the era the timepoint belongs to
    pub era: String,
    /// Seconds since the era start
    pub delta_t: f64,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInput {
    pub name: String,
    /// Spelled as the remote schema spells it
    #[serde(rename = "emmissionWavelength")]
    pub emission_wavelength: Option<f64>,
    pub excitation_wavelength: Option<f64>,
    pub acquisition_mode: Option<String>,
    /// `[r, g, b]`
    pub color: Option<[u8; 3]>,
}

/// Marks the channel-axis range `c_min..=c_max` as showing `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelViewInput {
    /// ID of the created channel
    pub channel: String,
    pub c_min: usize,
    pub c_max: usize,
}

// =============================================================================
// Representation payload
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneInput {
    pub z: usize,
    pub c: usize,
    pub t: usize,
    pub exposure_time: Option<f64>,
    pub delta_t: Option<f64>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub position_z: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSizeInput {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveSettingsInput {
    pub correction_collar: Option<f64>,
    /// Upper-cased medium tag, e.g. `OIL`
    pub medium: Option<String>,
    pub refractive_index: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagingEnvironmentInput {
    pub air_pressure: Option<f64>,
    pub co2_percent: Option<f64>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
}

/// OME-derived metadata attached to a representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmeroRepresentationInput {
    pub planes: Vec<PlaneInput>,
    /// ID of the created position
    pub position: Option<String>,
    /// ID of the created timepoint
    pub timepoint: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub physical_size: PhysicalSizeInput,
    /// ID of the created instrument
    pub instrument: Option<String>,
    pub channels: Vec<ChannelInput>,
    pub objective_settings: Option<ObjectiveSettingsInput>,
    pub imaging_environment: Option<ImagingEnvironmentInput>,
}

/// Everything submitted alongside the pixel array of one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentationInput {
    pub name: String,
    /// Dataset IDs
    pub datasets: Vec<String>,
    /// IDs of the files the representation was converted from
    pub file_origins: Vec<String>,
    pub tags: Vec<String>,
    pub views: Vec<ChannelViewInput>,
    pub omero: OmeroRepresentationInput,
}

// =============================================================================
// Responses
// =============================================================================

/// Reference to a remotely created entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A persisted representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationHandle {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Array descriptor
// =============================================================================

/// Layout of the raw sample bytes sent with a representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayDescriptor {
    pub shape: Vec<usize>,
    /// Axis labels, e.g. `"ctzyx"`
    pub dims: String,
    pub dtype: String,
    pub byte_order: String,
}

impl ArrayDescriptor {
    pub fn of(array: &NormalizedArray) -> Self {
        Self {
            shape: array.shape().to_vec(),
            dims: array.dims_string(),
            dtype: "float64".to_string(),
            byte_order: "little".to_string(),
        }
    }
}
