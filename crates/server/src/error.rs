//! API error types.

use crate::provisioning::ProvisioningError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portal_metadata::CounterError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("registration is full: {count}/{limit} seats taken")]
    QuotaExceeded { count: i64, limit: i64 },

    #[error("provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("counter error: {0}")]
    Counter(CounterError),

    #[error("core error: {0}")]
    Core(#[from] portal_core::Error),
}

impl From<CounterError> for ApiError {
    fn from(err: CounterError) -> Self {
        crate::metrics::record_counter_error(&err);
        match err {
            CounterError::QuotaExceeded { count, limit } => Self::QuotaExceeded { count, limit },
            CounterError::InvalidArgument(msg) => Self::BadRequest(msg),
            other => Self::Counter(other),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden(_) => "forbidden",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Provisioning(e) => match e {
                ProvisioningError::Conflict(_) => "conflict",
                ProvisioningError::NotFound(_) => "not_found",
                ProvisioningError::Rejected(_) | ProvisioningError::Unavailable(_) => {
                    "provisioning_error"
                }
            },
            Self::Counter(e) => match e {
                CounterError::StorageUnavailable => "storage_unavailable",
                CounterError::RecordMissing => "counter_missing",
                CounterError::QuotaExceeded { .. } => "quota_exceeded",
                CounterError::InvalidArgument(_) => "bad_request",
                CounterError::Storage(_) => "storage_error",
            },
            Self::Core(_) => "bad_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Provisioning(e) => match e {
                ProvisioningError::Conflict(_) => StatusCode::CONFLICT,
                ProvisioningError::NotFound(_) => StatusCode::NOT_FOUND,
                ProvisioningError::Rejected(_) | ProvisioningError::Unavailable(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Counter(e) => match e {
                CounterError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                CounterError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                CounterError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                CounterError::RecordMissing | CounterError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
