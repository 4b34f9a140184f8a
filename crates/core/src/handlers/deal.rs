//! Deal notifications, most of them geospatial.

use chrono::{DateTime, Duration, Utc};
use dealdrop_common::{AppError, AppResult};
use dealdrop_db::entities::notification_record::{Priority, RecipientType};
use serde_json::Value;

use super::{number, opt_text, radius_or, text};
use crate::domain::{
    DispatchResult, Event, EventType, LocationContext, NotificationDraft, NotificationMessage,
    Recipient,
};
use crate::geo::format_distance;
use crate::services::NotificationService;
use crate::validation::{
    GeoPoint, validate_deal_event_payload, validate_location, validate_location_deal_payload,
};

/// Fan-out radius for new deals when the event names none.
pub const DEAL_CREATED_RADIUS_KM: f64 = 5.0;

/// Fan-out radius for expiring deals when the event names none.
pub const DEAL_EXPIRING_RADIUS_KM: f64 = 3.0;

/// Fields shared by deal-created and deal-expiring.
struct DealFields {
    deal_id: String,
    title: String,
    business: String,
    discount: Option<f64>,
    image_url: Option<String>,
    origin: GeoPoint,
}

impl DealFields {
    fn read(payload: &Value) -> AppResult<Self> {
        validate_deal_event_payload(payload)?;
        Ok(Self {
            deal_id: text(payload, "dealId"),
            title: text(payload, "title"),
            business: opt_text(payload, "businessName")
                .unwrap_or_else(|| "A local business".into()),
            discount: number(payload, "discountPercentage"),
            image_url: opt_text(payload, "imageUrl"),
            origin: validate_location(&payload["location"])?,
        })
    }

    fn message(
        &self,
        event_type: EventType,
        title: String,
        body: String,
        recipient: &Recipient,
    ) -> NotificationMessage {
        let mut message = NotificationMessage::new(title, body)
            .with_action_url(format!("dealdrop://deals/{}", self.deal_id))
            .with_image_url(self.image_url.clone())
            .with_data("type", event_type.kind())
            .with_data("dealId", self.deal_id.clone());
        if let Some(distance) = recipient.context.distance_km {
            message = message.with_data("distance", format!("{distance:.2}"));
        }
        message
    }

    fn location_for(&self, recipient: &Recipient) -> LocationContext {
        LocationContext {
            latitude: self.origin.latitude,
            longitude: self.origin.longitude,
            distance_km: recipient.context.distance_km,
        }
    }

    fn offer(&self) -> String {
        match self.discount {
            Some(discount) => format!("{discount:.0}% off at {}", self.business),
            None => format!("{} at {}", self.title, self.business),
        }
    }
}

fn distance_label(recipient: &Recipient) -> String {
    recipient
        .context
        .distance_km
        .map_or_else(|| "nearby".to_string(), |km| format!("{} away", format_distance(km)))
}

fn parse_timestamp(payload: &Value, key: &str) -> Option<DateTime<Utc>> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// DEAL_CREATED: tell everyone near the deal about it.
pub async fn handle_deal_created(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let deal = DealFields::read(&event.payload)?;
    let radius_km = radius_or(
        event.metadata_value("notificationRadius"),
        DEAL_CREATED_RADIUS_KM,
    );
    let expires_at = parse_timestamp(&event.payload, "expiresAt");

    service
        .send_location_based_notifications(
            deal.origin.latitude,
            deal.origin.longitude,
            radius_km,
            |r: &Recipient| {
                deal.message(
                    EventType::DealCreated,
                    format!("New deal nearby: {}", deal.title),
                    format!("{}, {}", deal.offer(), distance_label(r)),
                    r,
                )
            },
            |r: &Recipient| {
                let mut draft =
                    NotificationDraft::new(event, EventType::DealCreated, RecipientType::Customer);
                draft.location = Some(deal.location_for(r));
                draft.expires_at = expires_at;
                draft
            },
            Priority::Normal,
        )
        .await
}

/// Seconds left on a deal, from `remainingSeconds` or else `expiresAt`.
///
/// `remainingSeconds` may be a float or a numeric string; fractions are
/// truncated.
#[allow(clippy::cast_possible_truncation)]
fn remaining_seconds(payload: &Value, now: DateTime<Utc>) -> AppResult<i64> {
    if let Some(seconds) = number(payload, "remainingSeconds").filter(|s| s.is_finite()) {
        return Ok((seconds.trunc() as i64).max(0));
    }
    parse_timestamp(payload, "expiresAt")
        .map(|expires| (expires - now).num_seconds().max(0))
        .ok_or_else(|| {
            AppError::Validation("Missing required field: remainingSeconds or expiresAt".into())
        })
}

/// Remaining time as shown to users: `2h 15m`, or `45 minutes` under an hour.
#[must_use]
pub fn format_remaining(seconds: i64) -> String {
    if seconds >= 3600 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{} minutes", seconds / 60)
    }
}

/// DEAL_EXPIRING: nudge people close by before the deal ends.
pub async fn handle_deal_expiring(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let deal = DealFields::read(&event.payload)?;
    let radius_km = radius_or(
        event.metadata_value("notificationRadius"),
        DEAL_EXPIRING_RADIUS_KM,
    );
    let now = Utc::now();
    let remaining = remaining_seconds(&event.payload, now)?;
    let remaining_label = format_remaining(remaining);
    let expires_at = now + Duration::seconds(remaining);

    service
        .send_location_based_notifications(
            deal.origin.latitude,
            deal.origin.longitude,
            radius_km,
            |r: &Recipient| {
                deal.message(
                    EventType::DealExpiring,
                    format!("Ending soon: {}", deal.title),
                    format!(
                        "Only {remaining_label} left for {}, {}",
                        deal.offer(),
                        distance_label(r)
                    ),
                    r,
                )
                .with_data("remainingSeconds", remaining.to_string())
            },
            |r: &Recipient| {
                let mut draft =
                    NotificationDraft::new(event, EventType::DealExpiring, RecipientType::Customer);
                draft.location = Some(deal.location_for(r));
                draft.expires_at = Some(expires_at);
                draft
            },
            Priority::High,
        )
        .await
}

/// One entry of a location-based-deal payload.
struct NearbyDeal {
    deal_id: String,
    title: String,
    business: Option<String>,
    discount: f64,
    distance_km: Option<f64>,
}

impl NearbyDeal {
    fn read(value: &Value) -> Self {
        Self {
            deal_id: text(value, "dealId"),
            title: text(value, "title"),
            business: opt_text(value, "businessName"),
            discount: number(value, "discountPercentage").unwrap_or_default(),
            distance_km: number(value, "distanceKm").or_else(|| number(value, "distance")),
        }
    }
}

/// LOCATION_BASED_DEAL: summarise deals found around one user.
pub async fn handle_location_based_deal(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    validate_location_deal_payload(&event.payload)?;
    let user_id = text(&event.payload, "userId");
    let deals: Vec<NearbyDeal> = event.payload["deals"]
        .as_array()
        .map(|deals| deals.iter().map(NearbyDeal::read).collect())
        .unwrap_or_default();

    let max_discount = deals.iter().map(|d| d.discount).fold(0.0, f64::max);
    let nearest = deals
        .iter()
        .filter(|d| d.distance_km.is_some())
        .min_by(|a, b| {
            a.distance_km
                .unwrap_or_default()
                .total_cmp(&b.distance_km.unwrap_or_default())
        })
        .or_else(|| deals.first());

    let title = match deals.len() {
        1 => format!("1 deal near you, up to {max_discount:.0}% off"),
        n => format!("{n} deals near you, up to {max_discount:.0}% off"),
    };
    let body = match nearest {
        Some(NearbyDeal {
            title,
            business,
            distance_km: Some(km),
            ..
        }) => {
            let place = business
                .as_deref()
                .map_or_else(String::new, |b| format!(" at {b}"));
            format!("Closest: {title}{place}, {} away", format_distance(*km))
        }
        Some(deal) => format!("Closest: {}", deal.title),
        None => "Open the app to see what's around you".to_string(),
    };

    let mut message = NotificationMessage::new(title, body)
        .with_data("type", EventType::LocationBasedDeal.kind())
        .with_data("dealCount", deals.len().to_string());
    if let Some(deal) = nearest {
        message = message
            .with_action_url(format!("dealdrop://deals/{}", deal.deal_id))
            .with_data("dealId", deal.deal_id.clone());
    }

    let mut draft =
        NotificationDraft::new(event, EventType::LocationBasedDeal, RecipientType::Customer);
    if let Some(location) = event.payload.get("location").filter(|l| !l.is_null()) {
        let point = validate_location(location)?;
        draft.location = Some(LocationContext {
            latitude: point.latitude,
            longitude: point.longitude,
            distance_km: nearest.and_then(|d| d.distance_km),
        });
    }

    service
        .send_to_user(&user_id, &message, draft, Priority::Normal)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::NO_NEARBY_USERS;
    use crate::services::notification::tests::{RecordingGateway, sample_event};
    use crate::store::MemoryRecordStore;
    use dealdrop_common::FanoutFailurePolicy;
    use serde_json::json;
    use std::sync::Arc;

    const KM_PER_DEGREE: f64 = 111.194_93;

    fn setup() -> (Arc<MemoryRecordStore>, Arc<RecordingGateway>, NotificationService) {
        let store = Arc::new(MemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let service =
            NotificationService::new(store.clone(), gateway.clone(), FanoutFailurePolicy::Abort);
        (store, gateway, service)
    }

    async fn seed_users(store: &MemoryRecordStore, distances_km: &[f64]) {
        for (i, km) in distances_km.iter().enumerate() {
            let user = format!("u{i}");
            store.add_user_location(&user, km / KM_PER_DEGREE, 0.0).await;
            store.add_token(&user, &format!("tok-{user}")).await;
        }
    }

    fn deal_payload() -> Value {
        json!({
            "dealId": "d1",
            "businessId": "b1",
            "businessName": "Cafe X",
            "title": "Croissant bundle",
            "discountPercentage": 40,
            "location": { "latitude": 0.0, "longitude": 0.0 }
        })
    }

    fn recipient_ids(records: &[(String, crate::domain::NewNotificationRecord)]) -> Vec<&str> {
        records.iter().map(|(_, r)| r.recipient_id.as_str()).collect()
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(8100), "2h 15m");
        assert_eq!(format_remaining(3600), "1h 0m");
        assert_eq!(format_remaining(2700), "45 minutes");
        assert_eq!(format_remaining(59), "0 minutes");
    }

    #[test]
    fn test_remaining_seconds_prefers_explicit_value() {
        let now = Utc::now();
        let expires = (now + Duration::seconds(600)).to_rfc3339();

        let payload = json!({ "remainingSeconds": 90, "expiresAt": expires });
        assert_eq!(remaining_seconds(&payload, now).unwrap(), 90);

        let payload = json!({ "expiresAt": expires });
        assert!((599..=600).contains(&remaining_seconds(&payload, now).unwrap()));

        assert!(remaining_seconds(&json!({}), now).is_err());
    }

    #[test]
    fn test_remaining_seconds_accepts_floats_and_strings() {
        let now = Utc::now();

        assert_eq!(
            remaining_seconds(&json!({ "remainingSeconds": 5400.0 }), now).unwrap(),
            5400
        );
        assert_eq!(
            remaining_seconds(&json!({ "remainingSeconds": 90.5 }), now).unwrap(),
            90
        );
        assert_eq!(
            remaining_seconds(&json!({ "remainingSeconds": "5400" }), now).unwrap(),
            5400
        );
        assert_eq!(
            remaining_seconds(&json!({ "remainingSeconds": -30 }), now).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_deal_created_default_radius() {
        let (store, _, service) = setup();
        seed_users(&store, &[1.2, 4.9, 5.1, 10.0]).await;
        let event = sample_event(EventType::DealCreated, deal_payload());

        let result = handle_deal_created(&service, &event).await.unwrap();

        assert_eq!(result.recipients, 2);
        assert_eq!(result.fcm_success, 2);
        let records = store.records().await;
        assert_eq!(recipient_ids(&records), vec!["u0", "u1"]);

        let (_, first) = &records[0];
        assert_eq!(first.body, "40% off at Cafe X, 1.2km away");
        assert_eq!(first.action_url.as_deref(), Some("dealdrop://deals/d1"));
        let location = first.location.unwrap();
        assert!((location.distance_km.unwrap() - 1.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_deal_created_metadata_radius() {
        let (store, _, service) = setup();
        seed_users(&store, &[0.85, 4.9]).await;
        let mut event = sample_event(EventType::DealCreated, deal_payload());
        event.metadata = json!({ "notificationRadius": 1 });

        let result = handle_deal_created(&service, &event).await.unwrap();

        assert_eq!(result.recipients, 1);
        assert!(store.records().await[0].1.body.ends_with("850m away"));
    }

    #[tokio::test]
    async fn test_deal_created_without_neighbours() {
        let (store, gateway, service) = setup();
        let event = sample_event(EventType::DealCreated, deal_payload());

        let result = handle_deal_created(&service, &event).await.unwrap();

        assert_eq!(result.recipients, 0);
        assert_eq!(result.reason.as_deref(), Some(NO_NEARBY_USERS));
        assert_eq!(gateway.batch_count().await, 0);
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_deal_expiring_default_radius_and_expiry() {
        let (store, gateway, service) = setup();
        seed_users(&store, &[2.5, 3.5]).await;
        let mut payload = deal_payload();
        payload["remainingSeconds"] = json!(5400);
        let event = sample_event(EventType::DealExpiring, payload);

        let before = Utc::now();
        let result = handle_deal_expiring(&service, &event).await.unwrap();

        assert_eq!(result.recipients, 1);
        let (_, record) = &store.records().await[0];
        assert_eq!(record.priority, Priority::High);
        assert!(record.body.starts_with("Only 1h 30m left"));
        let expires_at = record.expires_at.unwrap();
        assert!(expires_at >= before + Duration::seconds(5400));
        assert!(expires_at <= Utc::now() + Duration::seconds(5400));
        assert_eq!(gateway.batches.lock().await[0].2, Priority::High);
    }

    #[tokio::test]
    async fn test_deal_with_invalid_location_is_rejected() {
        let (_, _, service) = setup();
        let mut payload = deal_payload();
        payload["location"] = json!({ "latitude": 120.0, "longitude": 0.0 });
        let event = sample_event(EventType::DealCreated, payload);

        assert!(matches!(
            handle_deal_created(&service, &event).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_location_based_deal_summary() {
        let (store, _, service) = setup();
        let event = sample_event(
            EventType::LocationBasedDeal,
            json!({
                "userId": "u9",
                "location": { "latitude": 52.5, "longitude": 13.4 },
                "deals": [
                    { "dealId": "d1", "title": "Bagels", "discountPercentage": 20, "distanceKm": 2.3 },
                    { "dealId": "d2", "title": "Coffee", "businessName": "Cafe X", "discountPercentage": 50, "distanceKm": 0.4 },
                    { "dealId": "d3", "title": "Pizza", "discountPercentage": 30, "distanceKm": 1.1 }
                ]
            }),
        );

        let result = handle_location_based_deal(&service, &event).await.unwrap();

        assert_eq!(result.recipients, 1);
        let (_, record) = &store.records().await[0];
        assert_eq!(record.recipient_id, "u9");
        assert_eq!(record.title, "3 deals near you, up to 50% off");
        assert_eq!(record.body, "Closest: Coffee at Cafe X, 400m away");
        assert_eq!(record.data["dealId"], "d2");
        assert_eq!(record.priority, Priority::Normal);
        assert_eq!(record.location.unwrap().distance_km, Some(0.4));
    }
}
