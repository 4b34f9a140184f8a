//! `PostgreSQL` record store backed by the repositories.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dealdrop_common::{AppError, AppResult, IdGenerator};
use dealdrop_db::entities::notification_event::EventStatus;
use dealdrop_db::entities::{delivery_log, notification_event, notification_record};
use dealdrop_db::repositories::{
    DeliveryLogRepository, DeviceTokenRepository, NotificationEventRepository,
    NotificationRecordRepository, UserLocationRepository,
};
use sea_orm::{DatabaseConnection, Set};
use tracing::warn;

use super::{DeviceToken, RecordStore};
use crate::domain::{Event, NearbyUser, NewDeliveryLog, NewNotificationRecord};

/// Record store over the sea-orm repositories.
#[derive(Clone)]
pub struct DatabaseRecordStore {
    events: NotificationEventRepository,
    tokens: DeviceTokenRepository,
    records: NotificationRecordRepository,
    delivery_logs: DeliveryLogRepository,
    locations: UserLocationRepository,
    id_gen: IdGenerator,
}

impl DatabaseRecordStore {
    /// Create a store sharing one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            events: NotificationEventRepository::new(db.clone()),
            tokens: DeviceTokenRepository::new(db.clone()),
            records: NotificationRecordRepository::new(db.clone()),
            delivery_logs: DeliveryLogRepository::new(db.clone()),
            locations: UserLocationRepository::new(db),
            id_gen: IdGenerator::new(),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Failed to encode: {e}")))
}

#[async_trait]
impl RecordStore for DatabaseRecordStore {
    async fn get_event(&self, event_id: &str) -> AppResult<Option<Event>> {
        Ok(self.events.find_by_id(event_id).await?.map(Event::from))
    }

    async fn update_event_status(
        &self,
        event: &Event,
        status: EventStatus,
        error_message: Option<String>,
    ) -> AppResult<()> {
        if self.events.find_by_id(&event.event_id).await?.is_some() {
            self.events
                .update_status(&event.event_id, status, error_message)
                .await?;
            return Ok(());
        }

        let now = Utc::now();
        let model = notification_event::ActiveModel {
            id: Set(event.event_id.clone()),
            event_type: Set(event.event_type.clone()),
            event_name: Set(event.event_name.clone()),
            event_version: Set(event.event_version.clone()),
            payload: Set(event.payload.clone()),
            metadata: Set(event.metadata.clone()),
            status: Set(status),
            error_message: Set(error_message),
            processed_at: Set((status == EventStatus::Processed).then(|| now.into())),
            created_at: Set(event.timestamp.into()),
            updated_at: Set(Some(now.into())),
        };
        self.events.create(model).await?;
        Ok(())
    }

    async fn active_tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>> {
        self.tokens.find_deliverable_by_user(user_id).await
    }

    async fn save_notification(&self, record: NewNotificationRecord) -> AppResult<String> {
        let id = self.id_gen.generate();
        let location = record.location.as_ref().map(to_json).transpose()?;

        let model = notification_record::ActiveModel {
            id: Set(id.clone()),
            event_id: Set(record.event_id),
            event_type: Set(record.event_type),
            recipient_id: Set(record.recipient_id),
            recipient_type: Set(record.recipient_type),
            title: Set(record.title),
            body: Set(record.body),
            data: Set(to_json(&record.data)?),
            image_url: Set(record.image_url),
            action_url: Set(record.action_url),
            location: Set(location),
            priority: Set(record.priority),
            expires_at: Set(record.expires_at.map(Into::into)),
            created_at: Set(Utc::now().into()),
        };

        self.records.create(model).await?;
        Ok(id)
    }

    async fn append_delivery_log(&self, entry: NewDeliveryLog) -> AppResult<String> {
        let id = self.id_gen.generate();

        let model = delivery_log::ActiveModel {
            id: Set(id.clone()),
            notification_id: Set(entry.notification_id),
            channel: Set(entry.channel),
            status: Set(entry.status),
            provider: Set(entry.provider),
            provider_message_id: Set(entry.provider_message_id),
            provider_response: Set(Some(entry.provider_response)),
            created_at: Set(Utc::now().into()),
        };

        self.delivery_logs.create(model).await?;
        Ok(id)
    }

    async fn mark_token_failed(&self, token: &str, reason: &str) -> AppResult<()> {
        self.tokens.mark_failure(token, reason).await?;
        Ok(())
    }

    async fn mark_token_success(&self, token: &str) -> AppResult<()> {
        self.tokens.mark_success(token).await?;
        Ok(())
    }

    async fn find_users_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Vec<NearbyUser> {
        match self
            .locations
            .find_within_radius(latitude, longitude, radius_km)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .map(|row| NearbyUser {
                    user_id: row.user_id,
                    distance_km: row.distance_km,
                    location_type: row.location_type,
                    notification_radius_km: row.notification_radius_km,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, radius_km, "Radius lookup unavailable, treating as no nearby users");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::EventType;
    use dealdrop_db::entities::notification_record::{Priority, RecipientType};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample_event() -> Event {
        Event {
            event_id: "evt1".to_string(),
            event_type: EventType::OrderReady.as_str().to_string(),
            event_name: "order.ready".to_string(),
            event_version: None,
            payload: json!({ "orderId": "o1" }),
            metadata: json!({}),
            timestamp: Utc::now(),
            status: None,
        }
    }

    fn stored_event(status: EventStatus) -> notification_event::Model {
        notification_event::Model {
            id: "evt1".to_string(),
            event_type: "ORDER_READY".to_string(),
            event_name: "order.ready".to_string(),
            event_version: None,
            payload: json!({ "orderId": "o1" }),
            metadata: json!({}),
            status,
            error_message: None,
            processed_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_event_maps_model() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored_event(EventStatus::Queued)]])
                .into_connection(),
        );

        let store = DatabaseRecordStore::new(db);
        let event = store.get_event("evt1").await.unwrap().unwrap();

        assert_eq!(event.event_id, "evt1");
        assert_eq!(event.status, Some(EventStatus::Queued));
    }

    #[tokio::test]
    async fn test_update_status_inserts_inline_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification_event::Model>::new()])
                .append_query_results([[stored_event(EventStatus::Processing)]])
                .into_connection(),
        );

        let store = DatabaseRecordStore::new(db.clone());
        store
            .update_event_status(&sample_event(), EventStatus::Processing, None)
            .await
            .unwrap();

        drop(store);
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_save_notification_returns_new_id() {
        let stored = notification_record::Model {
            id: "ignored".to_string(),
            event_id: "evt1".to_string(),
            event_type: "ORDER_READY".to_string(),
            recipient_id: "u1".to_string(),
            recipient_type: RecipientType::Customer,
            title: "Ready".to_string(),
            body: "Pickup".to_string(),
            data: json!({}),
            image_url: None,
            action_url: None,
            location: None,
            priority: Priority::Urgent,
            expires_at: None,
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored]])
                .into_connection(),
        );

        let store = DatabaseRecordStore::new(db);
        let id = store
            .save_notification(NewNotificationRecord {
                event_id: "evt1".to_string(),
                event_type: "ORDER_READY".to_string(),
                recipient_id: "u1".to_string(),
                recipient_type: RecipientType::Customer,
                title: "Ready".to_string(),
                body: "Pickup".to_string(),
                data: BTreeMap::new(),
                image_url: None,
                action_url: None,
                location: None,
                priority: Priority::Urgent,
                expires_at: None,
            })
            .await
            .unwrap();

        assert_eq!(id.len(), 26);
        assert_eq!(id, id.to_lowercase());
    }

    #[tokio::test]
    async fn test_radius_lookup_degrades_to_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Custom("function radians does not exist".to_string())])
                .into_connection(),
        );

        let store = DatabaseRecordStore::new(db);
        let users = store.find_users_within_radius(52.5, 13.4, 5.0).await;

        assert!(users.is_empty());
    }
}
