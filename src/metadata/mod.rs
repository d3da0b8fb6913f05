//! Decoded image metadata.
//!
//! These types mirror the OME data model closely enough to carry everything
//! the mapper needs: instruments, per-series dimensions, planes, channels,
//! objective settings and imaging environment. Every attribute that may be
//! missing in a source file is an `Option`.

mod model;

pub use model::{
    checked_elements, parse_timestamp, Channel, DimensionOrder, ImagingEnvironment, Instrument, Microscope,
    ObjectiveSettings, OmeMetadata, Pixels, Plane, PlaneAxis, PlaneSizes, RawImageMetadata, Rgb,
    TiffData, MAX_SERIES_ELEMENTS,
};
