//! Metadata mapping.
//!
//! Turns decoded per-series metadata plus the caller's context (stage, era,
//! dataset) and options into the records the submission client accepts.
//! Everything here is a pure function of its inputs except
//! [`InstrumentMap::create`], which registers instruments remotely.

mod context;
mod derive;
mod instruments;
mod payload;

pub use context::{ConversionContext, ConversionOptions, Dataset, Era, OmeroFile, Stage};
pub use derive::{elapsed_seconds, position_input, timepoint_input, DERIVED_POSITION_Z};
pub use instruments::{instrument_input, InstrumentMap};
pub use payload::{
    channel_input, channel_views, dataset_ids, imaging_environment_input,
    objective_settings_input, physical_size_input, plane_input, representation_input,
    representation_name, SeriesRefs, CONVERTED_TAG,
};
