use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::CodefixError;

/// Error body shared by every endpoint: `{ "error": ..., "details": ... }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, None)
    }

    /// Map a pipeline error. Client errors carry their own message; server
    /// errors use `failure` as the headline and the cause as `details`.
    pub fn from_error(err: CodefixError, failure: &str) -> Self {
        match err {
            CodefixError::Validation(message) => Self::new(StatusCode::BAD_REQUEST, message, None),
            CodefixError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message, None),
            CodefixError::Acquisition(details) | CodefixError::ExternalService(details) => {
                error!(failure, details = %details, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure, Some(details))
            }
            other => {
                error!(failure, kind = other.kind(), error = %other, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure, Some(other.to_string()))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body", Some(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CodefixError::validation("missing"), StatusCode::BAD_REQUEST),
            (CodefixError::not_found("gone"), StatusCode::NOT_FOUND),
            (CodefixError::Acquisition("dns".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CodefixError::ExternalService("503".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CodefixError::Storage("locked".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_error(err, "Failed").status, status);
        }
    }

    #[test]
    fn test_server_error_carries_details() {
        let err = ApiError::from_error(
            CodefixError::Acquisition("could not resolve host".into()),
            "Failed to clone repository",
        );
        assert_eq!(err.body.error, "Failed to clone repository");
        assert_eq!(err.body.details.as_deref(), Some("could not resolve host"));
    }

    #[test]
    fn test_client_error_has_no_details() {
        let err = ApiError::from_error(CodefixError::not_found("Project not found"), "Failed");
        assert_eq!(err.body.error, "Project not found");
        let json = serde_json::to_value(&err.body).unwrap();
        assert!(json.get("details").is_none());
    }
}
