//! HTTP mapping for domain errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crowdshield_core::Error;
use serde_json::json;

/// Wrapper giving [`crowdshield_core::Error`] an HTTP representation.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Decode(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Delivery { .. } | Error::Serialization(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
