//! API Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use feature_engine::FeatureError;
use inference_engine::InferenceError;
use sensor_ingest::IngestError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the HTTP service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (missing field, unreadable multipart body)
    #[error("{0}")]
    BadRequest(String),

    #[error("Model not loaded")]
    ModelUnavailable,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(IngestError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ingest(_) => StatusCode::BAD_REQUEST,
            ApiError::Feature(FeatureError::Window(_)) => StatusCode::BAD_REQUEST,
            ApiError::Feature(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ModelUnavailable | ApiError::Inference(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
