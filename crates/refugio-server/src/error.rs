//! HTTP error responses.
//!
//! Bodies are deliberately generic; the specific cause is logged where the
//! error is produced.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use refugio_api::RefugioError;
use refugio_auth::validate::FieldErrors;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error("upstream unavailable")]
    Upstream,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthenticated => json!({ "error": "unauthenticated" }),
            ApiError::InvalidCredentials => json!({ "error": "Invalid email or password" }),
            ApiError::Validation(fields) => json!({ "error": "validation failed", "fields": fields }),
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::NotFound => json!({ "error": "not found" }),
            ApiError::Upstream => {
                json!({ "error": "Something went wrong. Please try again later." })
            }
            ApiError::Internal => json!({ "error": "internal error" }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RefugioError> for ApiError {
    fn from(e: RefugioError) -> Self {
        tracing::warn!(error = %e, "request failed");
        match e {
            RefugioError::Unauthenticated(_) => ApiError::Unauthenticated,
            RefugioError::Validation(_) => {
                ApiError::BadRequest("request rejected by the backend".to_string())
            }
            RefugioError::NotFound(_) => ApiError::NotFound,
            RefugioError::UpstreamUnavailable(_) => ApiError::Upstream,
            RefugioError::Internal(_) => ApiError::Internal,
        }
    }
}
