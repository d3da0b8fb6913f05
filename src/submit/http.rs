//! HTTP client for the data-management service.
//!
//! Entities are created with JSON `POST`s that answer `{ "id": ... }`.
//! Representations are uploaded as `multipart/form-data` with two parts:
//!
//! - `metadata`: `{ "representation": RepresentationInput, "array": ArrayDescriptor }`
//! - `data`: the array samples as little-endian `f64`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::SubmitError;
use crate::normalize::NormalizedArray;

use super::client::SubmissionClient;
use super::types::{
    ArrayDescriptor, ChannelInput, EntityRef, InstrumentInput, PositionInput,
    RepresentationHandle, RepresentationInput, TimepointInput,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct HttpSubmissionClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSubmissionClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. `https://data.example.org/api`
    /// * `token` - Optional bearer token sent with every request
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SubmitError::Http(format!("invalid API URL '{}': {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SubmitError> {
        self.base_url
            .join(path)
            .map_err(|e| SubmitError::Http(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SubmitError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Submitting entity");
        let response = self.post(url).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn non-2xx answers into `SubmitError::Status`.
async fn check_status(response: Response) -> Result<Response, SubmitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SubmitError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn create_instrument(&self, input: &InstrumentInput) -> Result<EntityRef, SubmitError> {
        self.post_json("instruments", input).await
    }

    async fn create_position(&self, input: &PositionInput) -> Result<EntityRef, SubmitError> {
        self.post_json("positions", input).await
    }

    async fn create_timepoint(&self, input: &TimepointInput) -> Result<EntityRef, SubmitError> {
        self.post_json("timepoints", input).await
    }

    async fn create_channel(&self, input: &ChannelInput) -> Result<EntityRef, SubmitError> {
        self.post_json("channels", input).await
    }

    async fn create_representation(
        &self,
        array: &NormalizedArray,
        input: &RepresentationInput,
    ) -> Result<RepresentationHandle, SubmitError> {
        let url = self.endpoint("representations")?;
        let metadata = serde_json::json!({
            "representation": input,
            "array": ArrayDescriptor::of(array),
        });
        let metadata = serde_json::to_string(&metadata)
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;

        let form = Form::new()
            .part("metadata", Part::text(metadata).mime_str("application/json")?)
            .part(
                "data",
                Part::bytes(array.to_le_bytes())
                    .file_name("data.f64")
                    .mime_str("application/octet-stream")?,
            );

        let response = self.post(url).multipart(form).send().await?;
        let response = check_status(response).await?;
        let handle: RepresentationHandle = response.json().await?;

        info!(
            id = %handle.id,
            name = %handle.name,
            shape = ?array.shape(),
            "Created representation"
        );
        Ok(handle)
    }
}
