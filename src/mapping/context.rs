use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file registered with the data-management service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OmeroFile {
    pub id: String,
    pub name: String,
    /// Storage location of the file's bytes (local path or `s3://bucket/key`)
    #[serde(default)]
    pub file: Option<String>,
    /// Datasets the file belongs to
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Spatial reference frame for positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Time interval that timepoints are measured against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
}

/// Optional entities a conversion is placed into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionContext {
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub era: Option<Era>,
    /// Overrides the file's own datasets when set
    #[serde(default)]
    pub dataset: Option<Dataset>,
}

/// Feature flags and tolerances of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Derive a stage position from the first plane
    #[serde(default = "default_true")]
    pub position_from_planes: bool,

    /// Derive a timepoint from the acquisition date
    #[serde(default = "default_true")]
    pub timepoint_from_time: bool,

    /// Create channel records and one view per channel
    #[serde(default = "default_true")]
    pub channels_from_channels: bool,

    #[serde(default)]
    pub position_tolerance: Option<f64>,

    #[serde(default)]
    pub timepoint_tolerance: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            position_from_planes: true,
            timepoint_from_time: true,
            channels_from_channels: true,
            position_tolerance: None,
            timepoint_tolerance: None,
        }
    }
}
