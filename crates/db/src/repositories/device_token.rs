//! Device token repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::device_token::{ActiveModel, Column, Entity, MAX_CONSECUTIVE_FAILURES, Model};
use dealdrop_common::{AppError, AppResult};

/// Repository for device token operations.
#[derive(Clone)]
pub struct DeviceTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl DeviceTokenRepository {
    /// Create a new device token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a device token row by its provider token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tokens for a user that are active and below the failure threshold.
    pub async fn find_deliverable_by_user(&self, user_id: &str) -> AppResult<Vec<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Active.eq(true))
            .filter(Column::ConsecutiveFailures.lt(MAX_CONSECUTIVE_FAILURES))
            .order_by_desc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Register a new token.
    pub async fn create(&self, token: ActiveModel) -> AppResult<Model> {
        token
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a failed send. Returns `None` when the token is unknown.
    pub async fn mark_failure(&self, token: &str, reason: &str) -> AppResult<Option<Model>> {
        let Some(existing) = self.find_by_token(token).await? else {
            debug!(token = %token, "Failure reported for unknown device token");
            return Ok(None);
        };

        let failures = existing.consecutive_failures + 1;
        let mut active: ActiveModel = existing.into();
        active.consecutive_failures = Set(failures);
        active.last_failure_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(Some(Utc::now().into()));

        active
            .update(self.db.as_ref())
            .await
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a successful send: reset the failure counter and touch `last_used_at`.
    pub async fn mark_success(&self, token: &str) -> AppResult<Option<Model>> {
        let Some(existing) = self.find_by_token(token).await? else {
            debug!(token = %token, "Success reported for unknown device token");
            return Ok(None);
        };

        let now = Utc::now();
        let mut active: ActiveModel = existing.into();
        active.consecutive_failures = Set(0);
        active.last_failure_reason = Set(None);
        active.last_used_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));

        active
            .update(self.db.as_ref())
            .await
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
