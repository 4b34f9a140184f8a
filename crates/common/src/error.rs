//! Error types for dealdrop.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Processing Errors ===
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("{0}")]
    EventFailed(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Push gateway error: {0}")]
    PushGateway(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,

            // 5xx Server Errors
            Self::UnknownEventType(_)
            | Self::EventFailed(_)
            | Self::Database(_)
            | Self::PushGateway(_)
            | Self::Config(_)
            | Self::ExternalService(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownEventType(_) => "UNKNOWN_EVENT_TYPE",
            Self::EventFailed(_) => "EVENT_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::PushGateway(_) => "PUSH_GATEWAY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Reclassify an error raised after an event was marked `processing`.
    ///
    /// Client errors become [`AppError::EventFailed`] with the same message;
    /// server errors are returned unchanged.
    #[must_use]
    pub fn into_event_failure(self) -> Self {
        if self.is_server_error() {
            self
        } else {
            Self::EventFailed(self.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Malformed JSON: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnknownEventType("X".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(AppError::Database("down".into()).is_server_error());
        assert!(!AppError::NotFound("e1".into()).is_server_error());
    }

    #[test]
    fn test_unknown_event_type_message() {
        let err = AppError::UnknownEventType("NOT_A_REAL_TYPE".into());
        assert_eq!(err.to_string(), "Unknown event type: NOT_A_REAL_TYPE");
        assert_eq!(err.error_code(), "UNKNOWN_EVENT_TYPE");
    }

    #[test]
    fn test_into_event_failure() {
        let err = AppError::Validation("Missing required field: customerId".into())
            .into_event_failure();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required field: customerId"
        );

        let err = AppError::Database("down".into()).into_event_failure();
        assert!(matches!(err, AppError::Database(_)));
    }
}
