//! HTTP layer for dealdrop.
//!
//! - **Webhook intake**: `POST /webhooks/events`, guarded by a shared secret
//! - **Health**: `GET /health`
//! - **Middleware**: correlation ids, tracing, timeouts, CORS
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use endpoints::router;
pub use middleware::{AppState, CORRELATION_ID_HEADER};

/// Build the full application with its middleware stack.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    router()
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::correlation_id))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
