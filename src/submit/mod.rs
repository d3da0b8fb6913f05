//! Submission of converted representations.
//!
//! [`SubmissionClient`] is the seam to the remote data-management service.
//! Two implementations ship with the crate: [`HttpSubmissionClient`] talks to
//! the service, [`DirectorySubmissionClient`] writes everything to disk.

mod client;
mod directory;
mod http;
mod types;

pub use client::SubmissionClient;
pub use directory::DirectorySubmissionClient;
pub use http::{HttpSubmissionClient, DEFAULT_TIMEOUT};
pub use types::{
    ArrayDescriptor, ChannelInput, ChannelViewInput, EntityRef, ImagingEnvironmentInput,
    InstrumentInput, ObjectiveSettingsInput, OmeroRepresentationInput, PhysicalSizeInput,
    PlaneInput, PositionInput, RepresentationHandle, RepresentationInput, TimepointInput,
};
