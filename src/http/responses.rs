//! JSON response bodies for the webhook endpoint
//!
//! Error bodies carry a fixed public message per error kind. The detailed
//! error (which may mention paths or configuration) only goes to the log.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::types::{DeploymentRequest, Error};

pub const STATUS_ERROR: &str = "error";
pub const STATUS_IGNORED: &str = "ignored";
pub const STATUS_TRIGGERED: &str = "triggered";

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    pub code: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &Error) -> Self {
        Self::with_message(public_message(error), error_to_code(error))
    }

    pub fn with_message(message: &str, code: &str) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: message.to_string(),
            code: code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found() -> Self {
        Self::with_message("Not found", "NOT_FOUND")
    }
}

/// A verified event that was deliberately not acted on
#[derive(Debug, Serialize)]
pub struct IgnoredResponse {
    pub status: String,
    pub message: String,
}

impl IgnoredResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: STATUS_IGNORED.to_string(),
            message,
        }
    }
}

/// A deployment was started (or at least attempted)
#[derive(Debug, Serialize)]
pub struct TriggeredResponse {
    pub status: String,
    pub message: String,
    pub branch: String,
    pub commit: String,
    pub timestamp: String,
    pub deploy_id: String,
}

impl From<&DeploymentRequest> for TriggeredResponse {
    fn from(request: &DeploymentRequest) -> Self {
        Self {
            status: STATUS_TRIGGERED.to_string(),
            message: "Deployment triggered".to_string(),
            branch: request.branch.clone(),
            commit: request.commit.clone(),
            timestamp: request.accepted_at.clone(),
            deploy_id: request.deploy_id.clone(),
        }
    }
}

fn public_message(error: &Error) -> &'static str {
    match error {
        Error::Authentication(_) => "Invalid signature",
        Error::InvalidPayload(_) => "Invalid JSON",
        Error::PayloadTooLarge { .. } => "Payload too large",
        Error::Validation { .. } => "Invalid request",
        Error::Config(_) | Error::Io(_) => "Internal server error",
    }
}

/// Convert error types to error codes
fn error_to_code(error: &Error) -> &'static str {
    match error {
        Error::Config(_) => "CONFIG_ERROR",
        Error::Authentication(_) => "AUTH_ERROR",
        Error::InvalidPayload(_) => "INVALID_PAYLOAD",
        Error::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        Error::Validation { .. } => "VALIDATION_ERROR",
        Error::Io(_) => "IO_ERROR",
    }
}

/// Convert error types to HTTP status codes
pub fn error_to_status_code(error: &Error) -> StatusCode {
    match error {
        Error::Authentication(_) => StatusCode::UNAUTHORIZED,
        Error::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = error_to_status_code(&self);
        let error_response = ErrorResponse::new(&self);
        (status_code, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfigError;

    #[test]
    fn test_error_response_creation() {
        let error = Error::Authentication("signature mismatch".to_string());

        let response = ErrorResponse::new(&error);
        assert_eq!(response.status, "error");
        assert_eq!(response.code, "AUTH_ERROR");
        assert_eq!(response.error, "Invalid signature");
        assert!(chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
    }

    #[test]
    fn test_error_response_hides_internal_details() {
        let error = Error::Config(ConfigError::FileNotFound {
            path: "/etc/deploy-webhook/secrets".to_string(),
        });
        let response = ErrorResponse::new(&error);
        assert_eq!(response.error, "Internal server error");
        assert!(!serde_json::to_string(&response).unwrap().contains("/etc"));

        let error = Error::InvalidPayload("expected value at line 1 column 2".to_string());
        let response = ErrorResponse::new(&error);
        assert_eq!(response.error, "Invalid JSON");
        assert_eq!(response.code, "INVALID_PAYLOAD");
    }

    #[test]
    fn test_error_to_status_code() {
        assert_eq!(
            error_to_status_code(&Error::Authentication("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_to_status_code(&Error::InvalidPayload("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_to_status_code(&Error::PayloadTooLarge { limit: 1024 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            error_to_status_code(&Error::Io(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_triggered_response_from_request() {
        let request = DeploymentRequest::new("main".to_string(), "abc123".to_string(), None);
        let response = TriggeredResponse::from(&request);

        let json: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "triggered");
        assert_eq!(json["message"], "Deployment triggered");
        assert_eq!(json["branch"], "main");
        assert_eq!(json["commit"], "abc123");
        assert_eq!(json["timestamp"], request.accepted_at.as_str());
        assert_eq!(json["deploy_id"], request.deploy_id.as_str());
    }

    #[test]
    fn test_ignored_response() {
        let json =
            serde_json::to_value(IgnoredResponse::new("Ignored non-push event".to_string()))
                .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ignored", "message": "Ignored non-push event"})
        );
    }

    #[test]
    fn test_not_found_response() {
        let response = ErrorResponse::not_found();
        assert_eq!(response.error, "Not found");
        assert_eq!(response.code, "NOT_FOUND");
    }
}
