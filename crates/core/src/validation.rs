//! Structural checks for webhook calls and event payloads.
//!
//! Envelope checks run before any status change. Type-specific checks run
//! again inside each handler, right before the payload is used, because
//! routing only proves the envelope is well formed.

use dealdrop_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::domain::Event;

/// Envelope fields that must be present and non-null.
pub const REQUIRED_ENVELOPE_FIELDS: [&str; 5] =
    ["eventId", "eventType", "payload", "metadata", "timestamp"];

/// Order payload fields every order handler relies on.
pub const REQUIRED_ORDER_FIELDS: [&str; 3] = ["orderId", "businessOwnerId", "customerId"];

/// Deal payload fields every deal handler relies on.
pub const REQUIRED_DEAL_FIELDS: [&str; 4] = ["dealId", "businessId", "title", "location"];

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    /// Degrees north
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Degrees east
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Check the shared webhook secret.
///
/// Fails closed: a missing header, a mismatch, and an empty configured secret
/// are all rejected.
pub fn validate_webhook_secret(provided: Option<&str>, expected: &str) -> AppResult<()> {
    match provided {
        Some(provided) if !expected.is_empty() && provided == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Check a raw webhook envelope before it is deserialized.
pub fn validate_event_payload(envelope: &Value) -> AppResult<()> {
    if !envelope.is_object() {
        return Err(AppError::Validation(
            "Event envelope must be a JSON object".to_string(),
        ));
    }
    require_fields(envelope, &REQUIRED_ENVELOPE_FIELDS)
}

/// Check an event that has already been deserialized or loaded.
pub fn validate_event(event: &Event) -> AppResult<()> {
    if event.event_id.trim().is_empty() {
        return Err(missing("eventId"));
    }
    if event.event_type.trim().is_empty() {
        return Err(missing("eventType"));
    }
    if event.payload.is_null() {
        return Err(missing("payload"));
    }
    if event.metadata.is_null() {
        return Err(missing("metadata"));
    }
    Ok(())
}

/// Check the fields shared by all order events.
pub fn validate_order_event_payload(payload: &Value) -> AppResult<()> {
    require_fields(payload, &REQUIRED_ORDER_FIELDS)
}

/// Check the fields shared by deal-created and deal-expiring.
pub fn validate_deal_event_payload(payload: &Value) -> AppResult<()> {
    require_fields(payload, &REQUIRED_DEAL_FIELDS)?;
    validate_location(&payload["location"]).map(|_| ())
}

/// Check and parse a location object.
pub fn validate_location(location: &Value) -> AppResult<GeoPoint> {
    let (Some(latitude), Some(longitude)) = (
        location.get("latitude").and_then(Value::as_f64),
        location.get("longitude").and_then(Value::as_f64),
    ) else {
        return Err(AppError::Validation(
            "Location requires numeric latitude and longitude".to_string(),
        ));
    };

    let point = GeoPoint {
        latitude,
        longitude,
    };
    point
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid location: {e}")))?;
    Ok(point)
}

/// Check a location-based-deal payload.
pub fn validate_location_deal_payload(payload: &Value) -> AppResult<()> {
    require_fields(payload, &["userId", "deals"])?;
    match payload["deals"].as_array() {
        Some(deals) if !deals.is_empty() => Ok(()),
        _ => Err(AppError::Validation(
            "deals must be a non-empty array".to_string(),
        )),
    }
}

/// Check a system-announcement payload.
pub fn validate_announcement_payload(payload: &Value) -> AppResult<()> {
    require_fields(payload, &["title", "message"])?;

    let has_users = payload
        .get("userIds")
        .and_then(Value::as_array)
        .is_some_and(|ids| !ids.is_empty());
    if has_users {
        return Ok(());
    }

    match payload.get("location") {
        Some(location) if !location.is_null() => validate_location(location).map(|_| ()),
        _ => Err(AppError::Validation(
            "Announcement requires userIds or location".to_string(),
        )),
    }
}

fn require_fields(value: &Value, fields: &[&str]) -> AppResult<()> {
    for field in fields {
        match value.get(field) {
            None | Some(Value::Null) => return Err(missing(field)),
            Some(Value::String(s)) if s.trim().is_empty() => return Err(missing(field)),
            Some(_) => {}
        }
    }
    Ok(())
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("Missing required field: {field}"))
}
