//! Mapping of one decoded series to its representation payload.

use crate::metadata::{
    Channel, ImagingEnvironment, ObjectiveSettings, Pixels, Plane, RawImageMetadata,
};
use crate::submit::{
    ChannelInput, ChannelViewInput, EntityRef, ImagingEnvironmentInput, ObjectiveSettingsInput,
    OmeroRepresentationInput, PhysicalSizeInput, PlaneInput, RepresentationInput,
};

use super::context::{ConversionContext, OmeroFile};

/// Tag attached to every converted representation.
pub const CONVERTED_TAG: &str = "converted";

/// Entities created for a series before its representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesRefs {
    pub instrument: Option<EntityRef>,
    pub position: Option<EntityRef>,
    pub timepoint: Option<EntityRef>,
    pub views: Vec<ChannelViewInput>,
}

/// `"{file} - {image}"`, or `"{file} - ({index})"` for unnamed images.
pub fn representation_name(file: &OmeroFile, image: &RawImageMetadata, index: usize) -> String {
    match image.name.as_deref() {
        Some(name) => format!("{} - {}", file.name, name),
        None => format!("{} - ({})", file.name, index),
    }
}

/// The explicit dataset if one was given, else the file's own datasets.
pub fn dataset_ids(file: &OmeroFile, context: &ConversionContext) -> Vec<String> {
    match &context.dataset {
        Some(dataset) => vec![dataset.id.clone()],
        None => file.datasets.iter().map(|d| d.id.clone()).collect(),
    }
}

pub fn channel_input(index: usize, channel: &Channel) -> ChannelInput {
    ChannelInput {
        name: channel
            .name
            .clone()
            .unwrap_or_else(|| format!("Channel {}", index)),
        emission_wavelength: channel.emission_wavelength,
        excitation_wavelength: channel.excitation_wavelength,
        acquisition_mode: channel.acquisition_mode.clone(),
        color: channel.color.map(|c| {
            let (r, g, b) = c.as_tuple();
            [r, g, b]
        }),
    }
}

/// One view per created channel, covering exactly that channel's index.
pub fn channel_views(channels: &[EntityRef]) -> Vec<ChannelViewInput> {
    channels
        .iter()
        .enumerate()
        .map(|(index, channel)| ChannelViewInput {
            channel: channel.id.clone(),
            c_min: index,
            c_max: index,
        })
        .collect()
}

pub fn plane_input(plane: &Plane) -> PlaneInput {
    PlaneInput {
        z: plane.the_z,
        c: plane.the_c,
        t: plane.the_t,
        exposure_time: plane.exposure_time,
        delta_t: plane.delta_t,
        position_x: plane.position_x,
        position_y: plane.position_y,
        position_z: plane.position_z,
    }
}

pub fn physical_size_input(pixels: &Pixels) -> PhysicalSizeInput {
    PhysicalSizeInput {
        x: pixels.physical_size_x,
        y: pixels.physical_size_y,
        z: pixels.physical_size_z,
    }
}

pub fn objective_settings_input(settings: &ObjectiveSettings) -> ObjectiveSettingsInput {
    ObjectiveSettingsInput {
        correction_collar: settings.correction_collar,
        medium: settings.medium.as_ref().map(|m| m.to_uppercase()),
        refractive_index: settings.refractive_index,
    }
}

pub fn imaging_environment_input(environment: &ImagingEnvironment) -> ImagingEnvironmentInput {
    ImagingEnvironmentInput {
        air_pressure: environment.air_pressure,
        co2_percent: environment.co2_percent,
        humidity: environment.humidity,
        temperature: environment.temperature,
    }
}

/// Build the full payload of series `index`.
pub fn representation_input(
    file: &OmeroFile,
    context: &ConversionContext,
    image: &RawImageMetadata,
    index: usize,
    refs: SeriesRefs,
) -> RepresentationInput {
    let pixels = &image.pixels;

    let omero = OmeroRepresentationInput {
        planes: pixels.planes.iter().map(plane_input).collect(),
        position: refs.position.map(|p| p.id),
        timepoint: refs.timepoint.map(|t| t.id),
        acquisition_date: image.acquisition_date,
        physical_size: physical_size_input(pixels),
        instrument: refs.instrument.map(|i| i.id),
        channels: pixels
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| channel_input(i, c))
            .collect(),
        objective_settings: image.objective_settings.as_ref().map(objective_settings_input),
        imaging_environment: image
            .imaging_environment
            .as_ref()
            .map(imaging_environment_input),
    };

    RepresentationInput {
        name: representation_name(file, image, index),
        datasets: dataset_ids(file, context),
        file_origins: vec![file.id.clone()],
        tags: vec![CONVERTED_TAG.to_string()],
        views: refs.views,
        omero,
    }
}
