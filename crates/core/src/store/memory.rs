//! In-memory record store for tests.
//!
//! Built with the `test-utils` feature. Radius lookups use the haversine
//! formula over stored coordinates.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use dealdrop_common::{AppError, AppResult, IdGenerator};
use dealdrop_db::entities::device_token::Platform;
use dealdrop_db::entities::notification_event::EventStatus;
use tokio::sync::RwLock;

use super::{DeviceToken, RecordStore};
use crate::domain::{Event, NearbyUser, NewDeliveryLog, NewNotificationRecord};
use crate::geo::haversine_km;

#[derive(Debug, Clone)]
struct StoredLocation {
    user_id: String,
    latitude: f64,
    longitude: f64,
    location_type: String,
    notification_radius_km: f64,
}

#[derive(Default)]
struct State {
    events: HashMap<String, Event>,
    event_errors: HashMap<String, Option<String>>,
    status_history: Vec<(String, EventStatus)>,
    tokens: Vec<DeviceToken>,
    records: Vec<(String, NewNotificationRecord)>,
    delivery_logs: Vec<(String, NewDeliveryLog)>,
    locations: Vec<StoredLocation>,
    failing_recipients: HashSet<String>,
    radius_lookup_unavailable: bool,
    writes: usize,
}

/// Record store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    state: RwLock<State>,
    id_gen: IdGenerator,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event.
    pub async fn insert_event(&self, event: Event) {
        let mut state = self.state.write().await;
        state.events.insert(event.event_id.clone(), event);
    }

    /// Seed a healthy device token.
    pub async fn add_token(&self, user_id: &str, token: &str) {
        self.add_token_with_failures(user_id, token, 0).await;
    }

    /// Seed a device token with an existing failure count.
    pub async fn add_token_with_failures(&self, user_id: &str, token: &str, failures: i32) {
        let mut state = self.state.write().await;
        let id = self.id_gen.generate();
        state.tokens.push(DeviceToken {
            id,
            user_id: user_id.to_string(),
            token: token.to_string(),
            platform: Platform::Android,
            active: true,
            consecutive_failures: failures,
            last_failure_reason: None,
            last_used_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        });
    }

    /// Seed a user's location.
    pub async fn add_user_location(&self, user_id: &str, latitude: f64, longitude: f64) {
        let mut state = self.state.write().await;
        state.locations.push(StoredLocation {
            user_id: user_id.to_string(),
            latitude,
            longitude,
            location_type: "current".to_string(),
            notification_radius_km: 10.0,
        });
    }

    /// Make every record write for this recipient fail.
    pub async fn fail_saves_for(&self, user_id: &str) {
        self.state
            .write()
            .await
            .failing_recipients
            .insert(user_id.to_string());
    }

    /// Make radius lookups behave as if the geospatial capability is missing.
    pub async fn disable_radius_lookup(&self) {
        self.state.write().await.radius_lookup_unavailable = true;
    }

    /// Current status of an event.
    pub async fn event_status(&self, event_id: &str) -> Option<EventStatus> {
        self.state
            .read()
            .await
            .events
            .get(event_id)
            .and_then(|e| e.status)
    }

    /// Last error recorded for an event.
    pub async fn event_error(&self, event_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .event_errors
            .get(event_id)
            .cloned()
            .flatten()
    }

    /// Every status transition recorded for an event, in order.
    pub async fn status_history(&self, event_id: &str) -> Vec<EventStatus> {
        self.state
            .read()
            .await
            .status_history
            .iter()
            .filter(|(id, _)| id == event_id)
            .map(|(_, status)| *status)
            .collect()
    }

    /// A stored token by value.
    pub async fn token(&self, token: &str) -> Option<DeviceToken> {
        self.state
            .read()
            .await
            .tokens
            .iter()
            .find(|t| t.token == token)
            .cloned()
    }

    /// All saved notification records with their IDs.
    pub async fn records(&self) -> Vec<(String, NewNotificationRecord)> {
        self.state.read().await.records.clone()
    }

    /// All appended delivery log entries with their IDs.
    pub async fn delivery_logs(&self) -> Vec<(String, NewDeliveryLog)> {
        self.state.read().await.delivery_logs.clone()
    }

    /// Number of mutating calls made through [`RecordStore`].
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_event(&self, event_id: &str) -> AppResult<Option<Event>> {
        Ok(self.state.read().await.events.get(event_id).cloned())
    }

    async fn update_event_status(
        &self,
        event: &Event,
        status: EventStatus,
        error_message: Option<String>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        let stored = state
            .events
            .entry(event.event_id.clone())
            .or_insert_with(|| event.clone());
        stored.status = Some(status);
        state
            .event_errors
            .insert(event.event_id.clone(), error_message);
        state.status_history.push((event.event_id.clone(), status));
        Ok(())
    }

    async fn active_tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>> {
        Ok(self
            .state
            .read()
            .await
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.is_deliverable())
            .cloned()
            .collect())
    }

    async fn save_notification(&self, record: NewNotificationRecord) -> AppResult<String> {
        let mut state = self.state.write().await;
        if state.failing_recipients.contains(&record.recipient_id) {
            return Err(AppError::Database(format!(
                "Failed to save notification for {}",
                record.recipient_id
            )));
        }
        state.writes += 1;
        let id = self.id_gen.generate();
        state.records.push((id.clone(), record));
        Ok(id)
    }

    async fn append_delivery_log(&self, entry: NewDeliveryLog) -> AppResult<String> {
        let mut state = self.state.write().await;
        state.writes += 1;
        let id = self.id_gen.generate();
        state.delivery_logs.push((id.clone(), entry));
        Ok(id)
    }

    async fn mark_token_failed(&self, token: &str, reason: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        if let Some(t) = state.tokens.iter_mut().find(|t| t.token == token) {
            t.consecutive_failures += 1;
            t.last_failure_reason = Some(reason.to_string());
            t.updated_at = Some(Utc::now().into());
        }
        Ok(())
    }

    async fn mark_token_success(&self, token: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        if let Some(t) = state.tokens.iter_mut().find(|t| t.token == token) {
            let now = Utc::now();
            t.consecutive_failures = 0;
            t.last_failure_reason = None;
            t.last_used_at = Some(now.into());
            t.updated_at = Some(now.into());
        }
        Ok(())
    }

    async fn find_users_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Vec<NearbyUser> {
        let state = self.state.read().await;
        if state.radius_lookup_unavailable {
            return Vec::new();
        }

        let mut users: Vec<NearbyUser> = state
            .locations
            .iter()
            .map(|loc| NearbyUser {
                user_id: loc.user_id.clone(),
                distance_km: haversine_km(latitude, longitude, loc.latitude, loc.longitude),
                location_type: loc.location_type.clone(),
                notification_radius_km: loc.notification_radius_km,
            })
            .filter(|u| u.distance_km <= radius_km)
            .collect();
        users.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        users
    }
}
