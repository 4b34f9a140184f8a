//! API endpoints.

mod health;
mod webhooks;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/webhooks", webhooks::router())
}
