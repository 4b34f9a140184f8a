//! Health endpoint.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use dealdrop_core::PushMode;
use serde::Serialize;

use crate::middleware::AppState;

const ACTIVE: &str = "active";

/// Health response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Per-component state
    pub components: Components,
    /// Whether pushes go to FCM or are simulated
    pub push_mode: PushMode,
    /// Server time of the check
    pub timestamp: DateTime<Utc>,
}

/// Component states.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Event processor
    pub event_processor: &'static str,
    /// Notification dispatcher
    pub notification_service: &'static str,
    /// Push gateway
    pub push_gateway: &'static str,
    /// Record store
    pub record_store: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        components: Components {
            event_processor: ACTIVE,
            notification_service: ACTIVE,
            push_gateway: ACTIVE,
            record_store: ACTIVE,
        },
        push_mode: state.processor.service().push_mode(),
        timestamp: Utc::now(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
