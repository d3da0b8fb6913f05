use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SubmitError;
use crate::normalize::NormalizedArray;

use super::types::{
    ChannelInput, EntityRef, InstrumentInput, PositionInput, RepresentationHandle,
    RepresentationInput, TimepointInput,
};

/// Remote creation API of the data-management service.
///
/// Every call is a single attempt: failures are returned to the caller as-is.
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn create_instrument(&self, input: &InstrumentInput) -> Result<EntityRef, SubmitError>;

    async fn create_position(&self, input: &PositionInput) -> Result<EntityRef, SubmitError>;

    async fn create_timepoint(&self, input: &TimepointInput) -> Result<EntityRef, SubmitError>;

    async fn create_channel(&self, input: &ChannelInput) -> Result<EntityRef, SubmitError>;

    /// Persist a normalized array together with its metadata.
    async fn create_representation(
        &self,
        array: &NormalizedArray,
        input: &RepresentationInput,
    ) -> Result<RepresentationHandle, SubmitError>;
}

#[async_trait]
impl<T: SubmissionClient + ?Sized> SubmissionClient for Arc<T> {
    async fn create_instrument(&self, input: &InstrumentInput) -> Result<EntityRef, SubmitError> {
        (**self).create_instrument(input).await
    }

    async fn create_position(&self, input: &PositionInput) -> Result<EntityRef, SubmitError> {
        (**self).create_position(input).await
    }

    async fn create_timepoint(&self, input: &TimepointInput) -> Result<EntityRef, SubmitError> {
        (**self).create_timepoint(input).await
    }

    async fn create_channel(&self, input: &ChannelInput) -> Result<EntityRef, SubmitError> {
        (**self).create_channel(input).await
    }

    async fn create_representation(
        &self,
        array: &NormalizedArray,
        input: &RepresentationInput,
    ) -> Result<RepresentationHandle, SubmitError> {
        (**self).create_representation(array, input).await
    }
}
