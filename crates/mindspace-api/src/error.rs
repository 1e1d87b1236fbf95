//! HTTP error mapping.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use mindspace_core::{Error, ValidationErrors, NON_FIELD_ERRORS};

pub const MSG_NOT_FOUND: &str = "Not found.";
pub const MSG_SERVER_ERROR: &str = "A server error occurred.";
pub const MSG_THROTTLED: &str = "Request was throttled.";

/// Error returned by handlers and extractors.
///
/// Validation failures serialize as a field-to-messages map; everything else
/// as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("too many requests")]
    TooManyRequests,
    #[error(transparent)]
    Internal(Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationErrors::single(field, message))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(errors) => ApiError::Validation(errors),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

/// Well-formed JSON of the wrong shape is a validation failure of the whole
/// body; anything else is a parse error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ApiError::invalid(NON_FIELD_ERRORS, err.body_text()),
            other => ApiError::BadRequest(format!("JSON parse error - {}", other.body_text())),
        }
    }
}

/// Non-numeric ids never match a route resource.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::BadRequest(msg) => (status, Json(json!({ "detail": msg }))).into_response(),
            ApiError::Unauthorized(msg) => {
                let mut response = (status, Json(json!({ "detail": msg }))).into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"api\""),
                );
                response
            }
            ApiError::NotFound(msg) => {
                debug!(reason = %msg, "Resource not found");
                (status, Json(json!({ "detail": MSG_NOT_FOUND }))).into_response()
            }
            ApiError::TooManyRequests => {
                (status, Json(json!({ "detail": MSG_THROTTLED }))).into_response()
            }
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (status, Json(json!({ "detail": MSG_SERVER_ERROR }))).into_response()
            }
        }
    }
}
