// Common DTOs for public API
//
// These types are shared across multiple API endpoints.

use axum::http::StatusCode;
use axum::Json;
use doorstate_core::DoorstateError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message returned for every rejected submission.
/// Identical for all reasons so a forger learns nothing about which check failed.
pub const REJECTION_MESSAGE: &str = "Submission rejected";

/// Message returned when the history store or anything else server-side fails.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    #[schema(example = "Submission rejected")]
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

/// Response wrapper for list endpoints.
/// All list endpoints return responses wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Error tuple returned by handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error to its HTTP response.
///
/// Rejections are already logged with their reason by the service layer.
pub fn error_response(err: DoorstateError) -> ApiError {
    match err {
        DoorstateError::Rejected(_) => {
            ErrorResponse::new(REJECTION_MESSAGE).into_response(StatusCode::BAD_REQUEST)
        }
        other => {
            tracing::error!(error = %other, "Request failed");
            ErrorResponse::new(INTERNAL_ERROR_MESSAGE)
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// 400 with a descriptive message, for malformed read queries
pub fn bad_request(message: impl Into<String>) -> ApiError {
    ErrorResponse::new(message).into_response(StatusCode::BAD_REQUEST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorstate_core::RejectionReason;

    #[test]
    fn test_rejections_share_one_response() {
        for reason in [
            RejectionReason::MissingField,
            RejectionReason::MalformedTimestamp,
            RejectionReason::MalformedState,
            RejectionReason::BadSignature,
            RejectionReason::StaleTimestamp,
        ] {
            let (status, Json(body)) = error_response(DoorstateError::rejected(reason));
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.error, REJECTION_MESSAGE);
        }
    }

    #[test]
    fn test_store_failure_is_internal() {
        let (status, Json(body)) =
            error_response(DoorstateError::store("connection refused to 10.0.0.5"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, INTERNAL_ERROR_MESSAGE);
    }
}
