//! Notification record repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, DatabaseConnection};

use crate::entities::notification_record::{ActiveModel, Model};
use dealdrop_common::{AppError, AppResult};

/// Repository for notification records.
#[derive(Clone)]
pub struct NotificationRecordRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRecordRepository {
    /// Create a new notification record repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a record. Records are never updated afterwards.
    pub async fn create(&self, record: ActiveModel) -> AppResult<Model> {
        record
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification_record::{Priority, RecipientType};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Set};
    use serde_json::json;

    fn create_test_record(id: &str, event_id: &str, recipient_id: &str) -> Model {
        Model {
            id: id.to_string(),
            event_id: event_id.to_string(),
            event_type: "ORDER_READY".to_string(),
            recipient_id: recipient_id.to_string(),
            recipient_type: RecipientType::Customer,
            title: "Your order is ready".to_string(),
            body: "Pickup code ABC12345".to_string(),
            data: json!({ "type": "order_ready", "orderId": "abc12345" }),
            image_url: None,
            action_url: Some("dealdrop://orders/abc12345".to_string()),
            location: None,
            priority: Priority::Urgent,
            expires_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create() {
        let record = create_test_record("n1", "evt1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = NotificationRecordRepository::new(db);
        let active = ActiveModel {
            id: Set(record.id.clone()),
            event_id: Set(record.event_id.clone()),
            event_type: Set(record.event_type.clone()),
            recipient_id: Set(record.recipient_id.clone()),
            recipient_type: Set(record.recipient_type),
            title: Set(record.title.clone()),
            body: Set(record.body.clone()),
            data: Set(record.data.clone()),
            image_url: Set(None),
            action_url: Set(record.action_url.clone()),
            location: Set(None),
            priority: Set(record.priority),
            expires_at: Set(None),
            created_at: Set(record.created_at),
        };
        let created = repo.create(active).await.unwrap();

        assert_eq!(created.id, "n1");
        assert_eq!(created.priority, Priority::Urgent);
    }

    #[tokio::test]
    async fn test_create_propagates_database_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([sea_orm::DbErr::Custom("duplicate key".to_string())])
                .into_connection(),
        );

        let repo = NotificationRecordRepository::new(db);
        let active: ActiveModel = create_test_record("n1", "evt1", "user1").into();

        assert!(matches!(repo.create(active).await, Err(AppError::Database(_))));
    }
}
