//! Request extractors.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::middleware::CorrelationId;

/// Header carrying the webhook shared secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the correlation id middleware; routers built without it still get an id.
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(Self::generate))
    }
}

/// Value of the `X-Webhook-Secret` header, if present and valid UTF-8.
#[derive(Debug, Clone)]
pub struct WebhookSecret(pub Option<String>);

impl<S> FromRequestParts<S> for WebhookSecret
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(WEBHOOK_SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        ))
    }
}
