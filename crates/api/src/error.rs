use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::SchedulingError;
use thiserror::Error;

use crate::middleware::metrics::record_scheduling_error;

/// HTTP face of a [`SchedulingError`].
///
/// The body is always `{status, msg}` with the negative status code of the
/// error class; the HTTP status is chosen per class.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(pub SchedulingError);

impl ApiError {
    pub fn payload(msg: impl Into<String>) -> Self {
        Self(SchedulingError::Payload(msg.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(SchedulingError::Unauthorized(msg.into()))
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self(SchedulingError::AccessDenied(msg.into()))
    }

    pub fn http_status(&self) -> StatusCode {
        match &self.0 {
            SchedulingError::Payload(_) => StatusCode::BAD_REQUEST,
            SchedulingError::AccessDenied(_) => StatusCode::FORBIDDEN,
            SchedulingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulingError::Occupied(_) | SchedulingError::Duplicate(_) => StatusCode::CONFLICT,
            SchedulingError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SchedulingError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        record_scheduling_error(self.0.kind());
        match &self.0 {
            SchedulingError::Unknown(msg) => {
                tracing::error!(kind = self.0.kind(), "Internal error: {}", msg);
            }
            SchedulingError::ServiceUnavailable(msg) => {
                tracing::warn!(kind = self.0.kind(), "Service unavailable: {}", msg);
            }
            other => {
                tracing::debug!(kind = other.kind(), "Request failed: {}", other.message());
            }
        }

        (status, Json(self.0.body())).into_response()
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        Self(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self(SchedulingError::from(errors))
    }
}

impl From<shared::pagination::PageError> for ApiError {
    fn from(err: shared::pagination::PageError) -> Self {
        Self(SchedulingError::from(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::payload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::payload(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::payload(rejection.body_text())
    }
}
