//! Position and timepoint derivation.

use chrono::{DateTime, Utc};

use crate::error::ConvertError;
use crate::metadata::{Pixels, RawImageMetadata};
use crate::submit::{PositionInput, TimepointInput};

use super::context::{ConversionOptions, Era, Stage};

/// Z written into every derived position.
pub const DERIVED_POSITION_Z: f64 = 1.0;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Stage position from the first plane of a series.
///
/// Requires a stage, `position_from_planes`, and at least one plane. Missing
/// plane coordinates read as 0; z is always [`DERIVED_POSITION_Z`].
pub fn position_input(
    pixels: &Pixels,
    stage: Option<&Stage>,
    options: &ConversionOptions,
) -> Option<PositionInput> {
    let stage = stage?;
    if !options.position_from_planes {
        return None;
    }
    let first = pixels.planes.first()?;
    Some(PositionInput {
        stage: stage.id.clone(),
        x: first.position_x.unwrap_or(0.0),
        y: first.position_y.unwrap_or(0.0),
        z: DERIVED_POSITION_Z,
        tolerance: options.position_tolerance,
    })
}

/// Timepoint of a series relative to an era start.
///
/// Requires an era, `timepoint_from_time`, and an acquisition date.
///
/// # Errors
/// `Precondition` if the era has no start instant.
pub fn timepoint_input(
    image: &RawImageMetadata,
    era: Option<&Era>,
    options: &ConversionOptions,
) -> Result<Option<TimepointInput>, ConvertError> {
    let (Some(era), Some(acquired)) = (era, image.acquisition_date) else {
        return Ok(None);
    };
    if !options.timepoint_from_time {
        return Ok(None);
    }
    let start = era.start.ok_or_else(|| {
        ConvertError::Precondition(format!("era '{}' has no start instant", era.id))
    })?;

    Ok(Some(TimepointInput {
        era: era.id.clone(),
        delta_t: elapsed_seconds(start, acquired)?,
        tolerance: options.timepoint_tolerance,
    }))
}

/// Sub-second part of `acquired - start`, in seconds.
///
/// Whole seconds and days of the difference are dropped and the remainder is
/// truncated to microseconds; a negative difference yields the complement,
/// e.g. -0.25 s becomes 0.75 s.
// TODO: send the total elapsed duration once the remote timepoint schema
// accepts it; only the sub-second remainder is sent for now.
pub fn elapsed_seconds(
    start: DateTime<Utc>,
    acquired: DateTime<Utc>,
) -> Result<f64, ConvertError> {
    let micros = (acquired - start).num_microseconds().ok_or_else(|| {
        ConvertError::Precondition(format!(
            "acquisition date {} is too far from era start {}",
            acquired, start
        ))
    })?;
    Ok(micros.rem_euclid(MICROS_PER_SECOND) as f64 / MICROS_PER_SECOND as f64)
}
