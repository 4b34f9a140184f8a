//! API middleware and shared state.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use dealdrop_common::IdGenerator;
use dealdrop_core::EventProcessor;
use tracing::{Instrument, info_span};

/// Header carrying the request correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Event processor behind the webhook
    pub processor: EventProcessor,
    /// Shared secret expected in `X-Webhook-Secret`
    pub webhook_secret: Arc<str>,
}

impl AppState {
    /// Create the state.
    #[must_use]
    pub fn new(processor: EventProcessor, webhook_secret: impl Into<Arc<str>>) -> Self {
        Self {
            processor,
            webhook_secret: webhook_secret.into(),
        }
    }
}

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// A fresh UUID v4 id.
    #[must_use]
    pub fn generate() -> Self {
        Self(IdGenerator::new().generate_correlation_id())
    }
}

/// Correlation id middleware.
///
/// Accepts `X-Correlation-Id` from the caller or generates one, runs the rest
/// of the stack inside a span carrying it, and echoes it on the response.
pub async fn correlation_id(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(CorrelationId::generate, |v| CorrelationId(v.to_string()));

    let span = info_span!(
        "request",
        correlation_id = %id.0,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(id.clone());

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.0) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
