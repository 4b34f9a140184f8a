//! Notification event repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::notification_event::{ActiveModel, Entity, EventStatus, Model};
use dealdrop_common::{AppError, AppResult};

/// Repository for notification event operations.
#[derive(Clone)]
pub struct NotificationEventRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationEventRepository {
    /// Create a new notification event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an event by ID or return an error.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))
    }

    /// Insert a new event.
    pub async fn create(&self, event: ActiveModel) -> AppResult<Model> {
        event
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move an event to a new processing status.
    ///
    /// `processed_at` is stamped when the event reaches `processed`. The error
    /// message is overwritten on every transition, so a successful re-run
    /// clears a previous failure.
    pub async fn update_status(
        &self,
        id: &str,
        status: EventStatus,
        error_message: Option<String>,
    ) -> AppResult<Model> {
        let event = self.get_by_id(id).await?;
        let now = Utc::now();
        let mut active: ActiveModel = event.into();

        active.status = Set(status);
        active.error_message = Set(error_message);
        if status == EventStatus::Processed {
            active.processed_at = Set(Some(now.into()));
        }
        active.updated_at = Set(Some(now.into()));

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_event(id: &str, status: EventStatus) -> Model {
        Model {
            id: id.to_string(),
            event_type: "ORDER_PAID".to_string(),
            event_name: "order.paid".to_string(),
            event_version: Some("1".to_string()),
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
    async fn test_find_by_id_found() {
        let event = create_test_event("evt1", EventStatus::Queued);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[event.clone()]])
                .into_connection(),
        );

        let repo = NotificationEventRepository::new(db);
        let found = repo.find_by_id("evt1").await.unwrap().unwrap();

        assert_eq!(found.id, "evt1");
        assert_eq!(found.event_type, "ORDER_PAID");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = NotificationEventRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status_failed_keeps_message() {
        let event = create_test_event("evt1", EventStatus::Processing);
        let mut failed = event.clone();
        failed.status = EventStatus::Failed;
        failed.error_message = Some("boom".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[event]])
                .append_query_results([[failed]])
                .into_connection(),
        );

        let repo = NotificationEventRepository::new(db);
        let updated = repo
            .update_status("evt1", EventStatus::Failed, Some("boom".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.status, EventStatus::Failed);
        assert_eq!(updated.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_update_status_missing_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = NotificationEventRepository::new(db);
        let result = repo
            .update_status("missing", EventStatus::Processing, None)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
