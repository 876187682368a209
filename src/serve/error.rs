//! HTTP error responses for the prediction endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::model::ModelError;
use crate::predictor::RequestError;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("prediction failed: {0}")]
    PredictionFailed(#[from] ModelError),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::PredictionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::Request(RequestError::NotAnObject) => "invalid_request",
            Self::Request(RequestError::MissingFields(_)) => "missing_fields",
            Self::Request(RequestError::UnknownFields(_)) => "unknown_fields",
            Self::Request(RequestError::InvalidValue { .. }) => "invalid_value",
            Self::PredictionFailed(_) => "prediction_failed",
        }
    }
}

/// Standard JSON error envelope.
#[derive(Debug, Serialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "prediction request failed");
        } else {
            tracing::warn!(error = %self, kind = self.error_type(), "prediction request rejected");
        }
        let body = ApiError {
            error: ApiErrorDetail {
                message: self.to_string(),
                error_type: self.error_type().to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
