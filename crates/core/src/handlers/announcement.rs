//! Operator broadcasts.

use std::collections::HashSet;

use dealdrop_common::{AppError, AppResult};
use dealdrop_db::entities::notification_record::{Priority, RecipientType};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{opt_text, radius_or, text};
use crate::domain::{
    DispatchResult, Event, EventType, LocationContext, NotificationDraft, NotificationMessage,
    Recipient,
};
use crate::services::NotificationService;
use crate::validation::{validate_announcement_payload, validate_location};

/// Broadcast radius when neither the payload nor the metadata names one.
pub const ANNOUNCEMENT_RADIUS_KM: f64 = 10.0;

/// An optional lower-case enum field such as `priority`.
fn enum_field<T: DeserializeOwned>(payload: &Value, key: &str) -> AppResult<Option<T>> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid {key}: {value}"))),
    }
}

/// Non-empty `userIds` in first-seen order, each listed once.
fn listed_user_ids(payload: &Value) -> Vec<String> {
    let Some(ids) = payload.get("userIds").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    ids.iter()
        .filter_map(Value::as_str)
        .filter(|id| !id.trim().is_empty() && seen.insert(*id))
        .map(ToString::to_string)
        .collect()
}

/// SYSTEM_ANNOUNCEMENT: broadcast to listed users or to everyone in an area.
pub async fn handle_system_announcement(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let payload = &event.payload;
    validate_announcement_payload(payload)?;

    let priority: Priority = enum_field(payload, "priority")?.unwrap_or_default();
    let recipient_type: RecipientType =
        enum_field(payload, "recipientType")?.unwrap_or(RecipientType::Customer);

    let mut message = NotificationMessage::new(text(payload, "title"), text(payload, "message"))
        .with_image_url(opt_text(payload, "imageUrl"))
        .with_data("type", EventType::SystemAnnouncement.kind())
        .with_data("eventId", event.event_id.clone());
    if let Some(url) = opt_text(payload, "actionUrl") {
        message = message.with_action_url(url);
    }

    let user_ids = listed_user_ids(payload);

    if !user_ids.is_empty() {
        let recipients = user_ids.into_iter().map(Recipient::user).collect();
        return service
            .send_to_multiple_users(
                recipients,
                |_: &Recipient| message.clone(),
                |_: &Recipient| {
                    NotificationDraft::new(event, EventType::SystemAnnouncement, recipient_type)
                },
                priority,
            )
            .await;
    }

    let origin = validate_location(&payload["location"])?;
    let radius_km = radius_or(
        payload
            .get("radiusKm")
            .filter(|r| !r.is_null())
            .or_else(|| event.metadata_value("notificationRadius")),
        ANNOUNCEMENT_RADIUS_KM,
    );

    service
        .send_location_based_notifications(
            origin.latitude,
            origin.longitude,
            radius_km,
            |_: &Recipient| message.clone(),
            |r: &Recipient| {
                let mut draft =
                    NotificationDraft::new(event, EventType::SystemAnnouncement, recipient_type);
                draft.location = Some(LocationContext {
                    latitude: origin.latitude,
                    longitude: origin.longitude,
                    distance_km: r.context.distance_km,
                });
                draft
            },
            priority,
        )
        .await
}
