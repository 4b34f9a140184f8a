//! Per-event-type handlers.
//!
//! Handlers are free functions that take the dispatcher explicitly. Each one
//! re-validates the payload fields it reads, builds message content and
//! record drafts, and hands delivery to [`NotificationService`].

pub mod announcement;
pub mod deal;
pub mod order;

use dealdrop_common::AppResult;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::domain::{DispatchResult, Event, EventType};
use crate::services::NotificationService;

/// A routed handler.
pub type Handler =
    for<'a> fn(&'a NotificationService, &'a Event) -> BoxFuture<'a, AppResult<DispatchResult>>;

/// Turn an `async fn(&NotificationService, &Event)` into a [`Handler`].
macro_rules! handler {
    ($f:path) => {{
        fn run<'a>(
            service: &'a NotificationService,
            event: &'a Event,
        ) -> BoxFuture<'a, AppResult<DispatchResult>> {
            Box::pin($f(service, event))
        }
        run as Handler
    }};
}

/// Handler for an event type.
#[must_use]
pub fn handler_for(event_type: EventType) -> Handler {
    match event_type {
        EventType::OrderCreated => handler!(order::handle_order_created),
        EventType::OrderPaid => handler!(order::handle_order_paid),
        EventType::OrderConfirmed => handler!(order::handle_order_confirmed),
        EventType::OrderReady => handler!(order::handle_order_ready),
        EventType::OrderCompleted => handler!(order::handle_order_completed),
        EventType::OrderCancelled => handler!(order::handle_order_cancelled),
        EventType::DealCreated => handler!(deal::handle_deal_created),
        EventType::DealExpiring => handler!(deal::handle_deal_expiring),
        EventType::LocationBasedDeal => handler!(deal::handle_location_based_deal),
        EventType::SystemAnnouncement => handler!(announcement::handle_system_announcement),
    }
}

/// A payload value as text. Numbers are rendered, null and missing are empty.
pub(crate) fn text(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A non-empty string field.
pub(crate) fn opt_text(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// A numeric field, accepting numbers encoded as strings.
pub(crate) fn number(payload: &Value, key: &str) -> Option<f64> {
    match payload.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Positive radius from `value`, or the default.
pub(crate) fn radius_or(value: Option<&Value>, default_km: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|r| *r > 0.0)
        .unwrap_or(default_km)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_event_type_routes() {
        for event_type in EventType::ALL {
            let _ = handler_for(event_type);
        }
    }

    #[test]
    fn test_payload_helpers() {
        let payload = json!({ "orderId": 1234, "name": "  ", "amount": "42.5", "n": null });

        assert_eq!(text(&payload, "orderId"), "1234");
        assert_eq!(text(&payload, "n"), "");
        assert_eq!(opt_text(&payload, "name"), None);
        assert_eq!(number(&payload, "amount"), Some(42.5));
        assert_eq!(number(&payload, "missing"), None);
    }

    #[test]
    fn test_radius_or() {
        assert_eq!(radius_or(Some(&json!(2)), 5.0), 2.0);
        assert_eq!(radius_or(Some(&json!(0)), 5.0), 5.0);
        assert_eq!(radius_or(Some(&json!("far")), 5.0), 5.0);
        assert_eq!(radius_or(None, 3.0), 3.0);
    }
}
