//! Delivery log repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, DatabaseConnection};

use crate::entities::delivery_log::{ActiveModel, Model};
use dealdrop_common::{AppError, AppResult};

/// Append-only repository for delivery attempts.
#[derive(Clone)]
pub struct DeliveryLogRepository {
    db: Arc<DatabaseConnection>,
}

impl DeliveryLogRepository {
    /// Create a new delivery log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create(&self, entry: ActiveModel) -> AppResult<Model> {
        entry
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::delivery_log::{DeliveryChannel, DeliveryStatus};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_entry(id: &str, status: DeliveryStatus) -> Model {
        Model {
            id: id.to_string(),
            notification_id: "n1".to_string(),
            channel: DeliveryChannel::Push,
            status,
            provider: "fcm".to_string(),
            provider_message_id: Some("projects/p/messages/1".to_string()),
            provider_response: Some(json!([{ "token": "tok1", "success": true }])),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create() {
        let entry = create_test_entry("log1", DeliveryStatus::Sent);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[entry.clone()]])
                .into_connection(),
        );

        let repo = DeliveryLogRepository::new(db);
        let created = repo.create(entry.into()).await.unwrap();

        assert_eq!(created.status, DeliveryStatus::Sent);
        assert_eq!(created.provider, "fcm");
    }

    #[tokio::test]
    async fn test_create_propagates_database_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([sea_orm::DbErr::Custom("disk full".to_string())])
                .into_connection(),
        );

        let repo = DeliveryLogRepository::new(db);
        let entry: ActiveModel = create_test_entry("log1", DeliveryStatus::Failed).into();
        let result = repo.create(entry).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
