//! Domain types shared by the dispatch pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dealdrop_common::AppError;
use dealdrop_db::entities::notification_event::{self, EventStatus};
use dealdrop_db::entities::notification_record::{Priority, RecipientType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kinds this service knows how to notify about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A new order was placed
    OrderCreated,
    /// An order was paid
    OrderPaid,
    /// The business accepted an order
    OrderConfirmed,
    /// An order is ready for pickup
    OrderReady,
    /// An order was picked up
    OrderCompleted,
    /// An order was cancelled
    OrderCancelled,
    /// A business published a deal
    DealCreated,
    /// A deal is about to expire
    DealExpiring,
    /// A user's location update matched nearby deals
    LocationBasedDeal,
    /// Operator broadcast
    SystemAnnouncement,
}

impl EventType {
    /// Every known event type.
    pub const ALL: [Self; 10] = [
        Self::OrderCreated,
        Self::OrderPaid,
        Self::OrderConfirmed,
        Self::OrderReady,
        Self::OrderCompleted,
        Self::OrderCancelled,
        Self::DealCreated,
        Self::DealExpiring,
        Self::LocationBasedDeal,
        Self::SystemAnnouncement,
    ];

    /// Wire name, e.g. `ORDER_READY`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::OrderPaid => "ORDER_PAID",
            Self::OrderConfirmed => "ORDER_CONFIRMED",
            Self::OrderReady => "ORDER_READY",
            Self::OrderCompleted => "ORDER_COMPLETED",
            Self::OrderCancelled => "ORDER_CANCELLED",
            Self::DealCreated => "DEAL_CREATED",
            Self::DealExpiring => "DEAL_EXPIRING",
            Self::LocationBasedDeal => "LOCATION_BASED_DEAL",
            Self::SystemAnnouncement => "SYSTEM_ANNOUNCEMENT",
        }
    }

    /// Lower snake case kind, sent to clients as the `type` data key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderPaid => "order_paid",
            Self::OrderConfirmed => "order_confirmed",
            Self::OrderReady => "order_ready",
            Self::OrderCompleted => "order_completed",
            Self::OrderCancelled => "order_cancelled",
            Self::DealCreated => "deal_created",
            Self::DealExpiring => "deal_expiring",
            Self::LocationBasedDeal => "location_based_deal",
            Self::SystemAnnouncement => "system_announcement",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::UnknownEventType(s.to_string()))
    }
}

/// A domain event as received on the webhook or loaded from storage.
///
/// `event_type` stays a plain string so that unknown types survive
/// deserialization and fail at routing time, after the event has been
/// marked `processing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event ID
    pub event_id: String,
    /// Wire type name
    pub event_type: String,
    /// Human readable name
    #[serde(default)]
    pub event_name: String,
    /// Producer schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_version: Option<String>,
    /// Type-specific payload
    pub payload: Value,
    /// Routing hints such as `notificationRadius`
    pub metadata: Value,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// Processing status as reported by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl Event {
    /// Metadata value by key, if metadata is an object.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

impl From<notification_event::Model> for Event {
    fn from(model: notification_event::Model) -> Self {
        Self {
            event_id: model.id,
            event_type: model.event_type,
            event_name: model.event_name,
            event_version: model.event_version,
            payload: model.payload,
            metadata: model.metadata,
            timestamp: model.created_at.with_timezone(&Utc),
            status: Some(model.status),
        }
    }
}

/// Content shown on the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Headline
    pub title: String,
    /// Body text
    pub body: String,
    /// Optional image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Deep link opened on tap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// String-keyed data forwarded to the app
    pub data: BTreeMap<String, String>,
}

impl NotificationMessage {
    /// Message with a title and body and no extras.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Set the deep link.
    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Set the image.
    #[must_use]
    pub fn with_image_url(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    /// Add a data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Location attached to a record for geospatial sends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationContext {
    /// Origin latitude
    pub latitude: f64,
    /// Origin longitude
    pub longitude: f64,
    /// Recipient's distance from the origin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Record fields the handler decides; the service fills in recipient and content.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    /// Source event
    pub event_id: String,
    /// Source event type
    pub event_type: EventType,
    /// Recipient role
    pub recipient_type: RecipientType,
    /// Location context
    pub location: Option<LocationContext>,
    /// When the notification stops being relevant
    pub expires_at: Option<DateTime<Utc>>,
}

impl NotificationDraft {
    /// Draft for a recipient of the given role.
    #[must_use]
    pub fn new(event: &Event, event_type: EventType, recipient_type: RecipientType) -> Self {
        Self {
            event_id: event.event_id.clone(),
            event_type,
            recipient_type,
            location: None,
            expires_at: None,
        }
    }
}

/// A notification record ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotificationRecord {
    /// Source event
    pub event_id: String,
    /// Source event type wire name
    pub event_type: String,
    /// Recipient user
    pub recipient_id: String,
    /// Recipient role
    pub recipient_type: RecipientType,
    /// Headline
    pub title: String,
    /// Body text
    pub body: String,
    /// Client data
    pub data: BTreeMap<String, String>,
    /// Image
    pub image_url: Option<String>,
    /// Deep link
    pub action_url: Option<String>,
    /// Location context
    pub location: Option<LocationContext>,
    /// Priority
    pub priority: Priority,
    /// Expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotificationRecord {
    /// Combine message content with a draft for one recipient.
    #[must_use]
    pub fn compose(
        recipient_id: &str,
        message: &NotificationMessage,
        draft: NotificationDraft,
        priority: Priority,
    ) -> Self {
        Self {
            event_id: draft.event_id,
            event_type: draft.event_type.as_str().to_string(),
            recipient_id: recipient_id.to_string(),
            recipient_type: draft.recipient_type,
            title: message.title.clone(),
            body: message.body.clone(),
            data: message.data.clone(),
            image_url: message.image_url.clone(),
            action_url: message.action_url.clone(),
            location: draft.location,
            priority,
            expires_at: draft.expires_at,
        }
    }
}

pub use dealdrop_db::entities::delivery_log::{DeliveryChannel, DeliveryStatus};

/// One delivery attempt, ready to be appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeliveryLog {
    /// Notification the attempt belongs to
    pub notification_id: String,
    /// Channel used
    pub channel: DeliveryChannel,
    /// Aggregate outcome of the batch
    pub status: DeliveryStatus,
    /// Provider name
    pub provider: String,
    /// First message id returned by the provider
    pub provider_message_id: Option<String>,
    /// Raw per-token report
    pub provider_response: Value,
}

/// A user found by a radius lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyUser {
    /// User ID
    pub user_id: String,
    /// Distance from the origin in kilometres
    pub distance_km: f64,
    /// Kind of stored location
    pub location_type: String,
    /// Radius the user opted into
    pub notification_radius_km: f64,
}

/// Per-recipient context handed to message and draft generators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipientContext {
    /// Distance from the event origin, for geospatial sends
    pub distance_km: Option<f64>,
    /// Kind of location the distance was measured from
    pub location_type: Option<String>,
}

/// A recipient of a multi-user send.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    /// User ID
    pub user_id: String,
    /// Context for personalisation
    pub context: RecipientContext,
}

impl Recipient {
    /// Recipient without context.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            context: RecipientContext::default(),
        }
    }
}

impl From<NearbyUser> for Recipient {
    fn from(user: NearbyUser) -> Self {
        Self {
            user_id: user.user_id,
            context: RecipientContext {
                distance_km: Some(user.distance_km),
                location_type: Some(user.location_type),
            },
        }
    }
}

/// Summary returned to the webhook caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Recipients a record was written for
    pub recipients: usize,
    /// Device tokens attempted
    pub fcm_sent: usize,
    /// Device tokens that succeeded
    pub fcm_success: usize,
    /// Records written
    pub notification_ids: Vec<String>,
    /// Why nothing was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Recipients skipped after an error under the `continue` policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_recipients: Option<Vec<String>>,
}

impl DispatchResult {
    /// Zero-recipient result with a reason.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: Self) {
        self.recipients += other.recipients;
        self.fcm_sent += other.fcm_sent;
        self.fcm_success += other.fcm_success;
        self.notification_ids.extend(other.notification_ids);
        if let Some(failed) = other.failed_recipients {
            self.failed_recipients
                .get_or_insert_with(Vec::new)
                .extend(failed);
        }
    }

    /// Record a recipient that was skipped after an error.
    pub fn push_failed(&mut self, user_id: impl Into<String>) {
        self.failed_recipients
            .get_or_insert_with(Vec::new)
            .push(user_id.into());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_round_trip_names() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_event_type() {
        let err = "NOT_A_REAL_TYPE".parse::<EventType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown event type: NOT_A_REAL_TYPE");
    }

    #[test]
    fn test_event_deserializes_envelope() {
        let event: Event = serde_json::from_value(json!({
            "eventId": "evt1",
            "eventType": "ORDER_READY",
            "eventName": "order.ready",
            "payload": { "orderId": "o1" },
            "metadata": { "notificationRadius": 2 },
            "timestamp": "2025-06-01T12:00:00Z",
            "status": "received"
        }))
        .unwrap();

        assert_eq!(event.event_id, "evt1");
        assert_eq!(event.status, Some(EventStatus::Queued));
        assert_eq!(event.metadata_value("notificationRadius"), Some(&json!(2)));
        assert!(event.event_version.is_none());
    }

    #[test]
    fn test_dispatch_result_merge() {
        let mut total = DispatchResult {
            recipients: 1,
            fcm_sent: 2,
            fcm_success: 1,
            notification_ids: vec!["n1".to_string()],
            ..Default::default()
        };
        total.merge(DispatchResult {
            recipients: 1,
            fcm_sent: 1,
            fcm_success: 1,
            notification_ids: vec!["n2".to_string()],
            ..Default::default()
        });

        assert_eq!(total.recipients, 2);
        assert_eq!(total.fcm_sent, 3);
        assert_eq!(total.fcm_success, 2);
        assert_eq!(total.notification_ids, vec!["n1", "n2"]);
        assert!(total.failed_recipients.is_none());
    }

    #[test]
    fn test_dispatch_result_serializes_camel_case() {
        let value = serde_json::to_value(DispatchResult::skipped("no nearby users")).unwrap();
        assert_eq!(
            value,
            json!({
                "recipients": 0,
                "fcmSent": 0,
                "fcmSuccess": 0,
                "notificationIds": [],
                "reason": "no nearby users"
            })
        );
    }
}
