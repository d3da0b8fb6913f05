//! HTTP request handlers for the operation API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /operations` - Registered operation signatures
//! - `POST /operations/convert_omero_file` - Convert one file

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::convert::{ConvertRequest, Converter};
use crate::error::{ConvertError, FormatError, IoError, TiffError};
use crate::source::FileSource;
use crate::submit::{RepresentationHandle, SubmissionClient};

use super::operations::{OperationDefinition, OperationRegistry};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the converter.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S, C> {
    /// Converter used for every request
    pub converter: Arc<Converter<S, C>>,

    /// Operations listed by `GET /operations`
    pub registry: Arc<OperationRegistry>,
}

impl<S: FileSource, C: SubmissionClient> AppState<S, C> {
    pub fn new(converter: Converter<S, C>) -> Self {
        Self {
            converter: Arc::new(converter),
            registry: Arc::new(OperationRegistry::new()),
        }
    }
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
            registry: Arc::clone(&self.registry),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "unsupported_format")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<OperationDefinition>,
}

/// Result of a conversion: one handle per series.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub representations: Vec<RepresentationHandle>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Status code and error type for a conversion failure.
pub fn error_status(err: &ConvertError) -> (StatusCode, &'static str) {
    match err {
        ConvertError::Precondition(_) => (StatusCode::BAD_REQUEST, "precondition_failed"),
        ConvertError::Format(format) => match format {
            FormatError::UnsupportedFormat { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
            }
            FormatError::Io(IoError::NotFound(_))
            | FormatError::Tiff(TiffError::Io(IoError::NotFound(_))) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            FormatError::Io(IoError::Connection(_)) => {
                (StatusCode::BAD_GATEWAY, "connection_error")
            }
            FormatError::Tiff(
                TiffError::UnsupportedCompression(_)
                | TiffError::UnsupportedSampleFormat { .. }
                | TiffError::UnsupportedPredictor(_),
            ) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format"),
            FormatError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            FormatError::Tiff(_) | FormatError::Metadata { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "decode_error")
            }
        },
        ConvertError::Normalize(_) => (StatusCode::INTERNAL_SERVER_ERROR, "normalization_error"),
        ConvertError::Submit(_) => (StatusCode::BAD_GATEWAY, "submission_error"),
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self);
        let error_response = ErrorResponse::with_status(error_type, self.to_string(), status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List registered operations.
pub async fn operations_handler<S, C>(State(state): State<AppState<S, C>>) -> Json<OperationsResponse>
where
    S: FileSource + 'static,
    C: SubmissionClient + 'static,
{
    Json(OperationsResponse {
        operations: state.registry.list().to_vec(),
    })
}

/// Handle conversion requests.
///
/// # Endpoint
///
/// `POST /operations/convert_omero_file`
///
/// # Response
///
/// `200 OK` with `{ "representations": [{ "id": ..., "name": ... }] }`.
///
/// # Errors
///
/// - `400 Bad Request`: No file provided, era without start
/// - `404 Not Found`: File does not exist in storage
/// - `415 Unsupported Media Type`: Format cannot be converted
/// - `502 Bad Gateway`: Submission to the data platform failed
/// - `500 Internal Server Error`: Decoding or normalization failed
pub async fn convert_handler<S, C>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ConvertError>
where
    S: FileSource + 'static,
    C: SubmissionClient + 'static,
{
    match state.converter.convert(&request).await {
        Ok(representations) => {
            info!(
                file = %request.file.name,
                representations = representations.len(),
                "Conversion request completed"
            );
            Ok(Json(ConvertResponse { representations }))
        }
        Err(err) => {
            let (status, _) = error_status(&err);
            if status.is_server_error() {
                error!(file = %request.file.name, error = %err, "Conversion failed");
            } else {
                warn!(file = %request.file.name, error = %err, "Conversion rejected");
            }
            Err(err)
        }
    }
}
