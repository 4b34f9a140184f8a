//! Webhook intake.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use dealdrop_common::{AppError, AppResult};
use dealdrop_core::validation::{validate_event_payload, validate_webhook_secret};
use dealdrop_core::{Event, ProcessOutcome};
use serde_json::Value;
use tracing::info;

use crate::extractors::WebhookSecret;
use crate::middleware::{AppState, CorrelationId};
use crate::response::{WebhookAccepted, WebhookRejected};

/// Receive one event.
///
/// The secret is checked before the body is parsed. A body of exactly
/// `{"eventId": "..."}` processes a stored event; anything else must be a
/// full envelope and is processed without a storage read.
async fn receive_event(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    WebhookSecret(secret): WebhookSecret,
    body: Bytes,
) -> Response {
    match handle(&state, &correlation_id, secret.as_deref(), &body).await {
        Ok(outcome) => WebhookAccepted::from(outcome).into_response(),
        Err(e) => WebhookRejected::from(e).into_response(),
    }
}

async fn handle(
    state: &AppState,
    correlation_id: &str,
    secret: Option<&str>,
    body: &[u8],
) -> AppResult<ProcessOutcome> {
    validate_webhook_secret(secret, &state.webhook_secret)?;

    let envelope: Value = serde_json::from_slice(body)?;
    if let Some(event_id) = event_reference(&envelope) {
        info!(event_id, correlation_id, "Processing stored event");
        return state.processor.process_event_by_id(event_id).await;
    }

    validate_event_payload(&envelope)?;
    let event: Event = serde_json::from_value(envelope)
        .map_err(|e| AppError::Validation(format!("Invalid event envelope: {e}")))?;
    info!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        correlation_id,
        "Processing inline event"
    );
    state.processor.process(event).await
}

/// The id of a `{"eventId": "..."}` reference body.
fn event_reference(envelope: &Value) -> Option<&str> {
    match envelope.as_object() {
        Some(map) if map.len() == 1 => map.get("eventId").and_then(Value::as_str),
        _ => None,
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(receive_event))
}
