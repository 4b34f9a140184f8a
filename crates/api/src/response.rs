//! Webhook response bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dealdrop_common::AppError;
use dealdrop_core::ProcessOutcome;
use serde::Serialize;

/// Body of a successful webhook call.
#[derive(Debug, Serialize)]
pub struct WebhookAccepted {
    success: bool,
    #[serde(flatten)]
    outcome: ProcessOutcome,
}

impl From<ProcessOutcome> for WebhookAccepted {
    fn from(outcome: ProcessOutcome) -> Self {
        Self {
            success: true,
            outcome,
        }
    }
}

impl IntoResponse for WebhookAccepted {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Body of a failed webhook call.
#[derive(Debug, Serialize)]
pub struct WebhookRejected {
    success: bool,
    error: String,
    #[serde(skip)]
    status: StatusCode,
}

/// HTTP status for a webhook failure.
///
/// Only authentication and structural envelope problems are client errors.
/// Anything that goes wrong while processing is a server error. That covers
/// a missing event, an unknown type and a payload the handler rejects.
#[must_use]
pub const fn webhook_status(err: &AppError) -> StatusCode {
    match err {
        AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AppError> for WebhookRejected {
    fn from(err: AppError) -> Self {
        let status = webhook_status(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, code = err.error_code(), "Webhook processing failed");
        } else {
            tracing::debug!(error = %err, code = err.error_code(), "Webhook rejected");
        }
        Self {
            success: false,
            error: err.to_string(),
            status,
        }
    }
}

impl IntoResponse for WebhookRejected {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_status_mapping() {
        assert_eq!(webhook_status(&AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            webhook_status(&AppError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            webhook_status(&AppError::NotFound("Event e1 not found".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            webhook_status(&AppError::UnknownEventType("X".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            webhook_status(&AppError::EventFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejected_body() {
        let rejected = WebhookRejected::from(AppError::UnknownEventType("X".into()));
        let body = serde_json::to_value(&rejected).unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "Unknown event type: X" })
        );
    }
}
