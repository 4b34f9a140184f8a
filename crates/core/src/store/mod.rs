//! Durable state behind the dispatch pipeline.
//!
//! [`RecordStore`] is the only component that owns state. The pipeline reads
//! and writes through it in read-then-write sequences with no optimistic
//! concurrency, so two overlapping invocations for the same event can both
//! send.

mod database;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

pub use database::DatabaseRecordStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryRecordStore;

use std::sync::Arc;

use async_trait::async_trait;
use dealdrop_common::AppResult;
use dealdrop_db::entities::notification_event::EventStatus;

use crate::domain::{Event, NearbyUser, NewDeliveryLog, NewNotificationRecord};

pub use dealdrop_db::entities::device_token::Model as DeviceToken;

/// Persistence operations used by the processor and the dispatcher.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load an event by ID.
    async fn get_event(&self, event_id: &str) -> AppResult<Option<Event>>;

    /// Record a status transition.
    ///
    /// Events delivered inline on the webhook may not exist yet; they are
    /// stored with the given status.
    async fn update_event_status(
        &self,
        event: &Event,
        status: EventStatus,
        error_message: Option<String>,
    ) -> AppResult<()>;

    /// Tokens for a user that are active and have fewer than three
    /// consecutive failures.
    async fn active_tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>>;

    /// Persist a notification record and return its ID.
    async fn save_notification(&self, record: NewNotificationRecord) -> AppResult<String>;

    /// Append a delivery log entry and return its ID.
    async fn append_delivery_log(&self, entry: NewDeliveryLog) -> AppResult<String>;

    /// Count a failed send against a token.
    async fn mark_token_failed(&self, token: &str, reason: &str) -> AppResult<()>;

    /// Reset a token's failure counter after a successful send.
    async fn mark_token_success(&self, token: &str) -> AppResult<()>;

    /// Users within `radius_km` of the origin, nearest first.
    ///
    /// Never fails: when the lookup is unavailable the result is empty.
    async fn find_users_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Vec<NearbyUser>;
}

/// Shared handle to a record store.
pub type SharedRecordStore = Arc<dyn RecordStore>;
