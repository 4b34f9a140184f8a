//! Event processor.
//!
//! Drives one event through `queued -> processing -> processed | failed` and
//! routes it to its handler. Status writes and handler side effects are
//! separate store calls with no transaction around them: a crash between a
//! send and the final status write leaves the event in `processing`, and a
//! re-delivered event is processed again.

use chrono::{DateTime, Utc};
use dealdrop_common::{AppError, AppResult};
use dealdrop_db::entities::notification_event::EventStatus;
use serde::Serialize;
use tracing::{error, info, warn};

use super::NotificationService;
use crate::domain::{DispatchResult, Event, EventType};
use crate::handlers::handler_for;
use crate::store::SharedRecordStore;
use crate::validation::validate_event;

/// Outcome of a successfully processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// Event ID
    pub event_id: String,
    /// Event type wire name
    pub event_type: String,
    /// What the handler delivered
    pub result: DispatchResult,
    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

/// Event processor.
#[derive(Clone)]
pub struct EventProcessor {
    store: SharedRecordStore,
    service: NotificationService,
}

impl EventProcessor {
    /// Create a processor writing status through the service's store.
    #[must_use]
    pub fn new(service: NotificationService) -> Self {
        Self {
            store: service.store().clone(),
            service,
        }
    }

    /// The dispatcher handlers run against.
    #[must_use]
    pub const fn service(&self) -> &NotificationService {
        &self.service
    }

    /// Load a stored event and process it.
    pub async fn process_event_by_id(&self, event_id: &str) -> AppResult<ProcessOutcome> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
        self.process(event).await
    }

    /// Validate, route and run one event, recording each status transition.
    ///
    /// Structural validation failures return before any status is written.
    /// Once the event is `processing`, every failure is returned as a server
    /// error, even when the handler rejected the payload.
    pub async fn process(&self, event: Event) -> AppResult<ProcessOutcome> {
        validate_event(&event)?;

        self.store
            .update_event_status(&event, EventStatus::Processing, None)
            .await?;
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Processing event"
        );

        match self.dispatch(&event).await {
            Ok(result) => {
                self.store
                    .update_event_status(&event, EventStatus::Processed, None)
                    .await?;
                info!(
                    event_id = %event.event_id,
                    recipients = result.recipients,
                    fcm_sent = result.fcm_sent,
                    fcm_success = result.fcm_success,
                    "Event processed"
                );
                Ok(ProcessOutcome {
                    event_id: event.event_id,
                    event_type: event.event_type,
                    result,
                    processed_at: Utc::now(),
                })
            }
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "Event processing failed");
                if let Err(status_err) = self
                    .store
                    .update_event_status(&event, EventStatus::Failed, Some(e.to_string()))
                    .await
                {
                    warn!(
                        event_id = %event.event_id,
                        error = %status_err,
                        "Failed to record failed status"
                    );
                }
                Err(e.into_event_failure())
            }
        }
    }

    async fn dispatch(&self, event: &Event) -> AppResult<DispatchResult> {
        let event_type: EventType = event.event_type.parse()?;
        let handler = handler_for(event_type);
        handler(&self.service, event).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::{RecordingGateway, sample_event};
    use crate::store::MemoryRecordStore;
    use dealdrop_common::FanoutFailurePolicy;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryRecordStore>, EventProcessor) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = NotificationService::new(
            store.clone(),
            Arc::new(RecordingGateway::default()),
            FanoutFailurePolicy::Abort,
        );
        (store, EventProcessor::new(service))
    }

    fn completed_event() -> Event {
        sample_event(
            EventType::OrderCompleted,
            json!({
                "orderId": "abc123def456",
                "customerId": "u1",
                "businessOwnerId": "u2",
                "amount": 42.5,
                "businessName": "Cafe X"
            }),
        )
    }

    #[tokio::test]
    async fn test_successful_event_is_processed() {
        let (store, processor) = setup();

        let outcome = processor.process(completed_event()).await.unwrap();

        assert_eq!(outcome.event_id, "evt1");
        assert_eq!(outcome.event_type, "ORDER_COMPLETED");
        assert_eq!(outcome.result.recipients, 2);
        assert_eq!(
            store.status_history("evt1").await,
            vec![EventStatus::Processing, EventStatus::Processed]
        );
    }

    #[tokio::test]
    async fn test_unknown_event_type_marks_failed() {
        let (store, processor) = setup();
        let mut event = completed_event();
        event.event_type = "NOT_A_REAL_TYPE".to_string();

        let err = processor.process(event).await.unwrap_err();

        assert!(matches!(err, AppError::UnknownEventType(_)));
        assert_eq!(store.event_status("evt1").await, Some(EventStatus::Failed));
        assert_eq!(
            store.event_error("evt1").await.as_deref(),
            Some("Unknown event type: NOT_A_REAL_TYPE")
        );
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_envelope_changes_nothing() {
        let (store, processor) = setup();
        let mut event = completed_event();
        event.metadata = serde_json::Value::Null;

        let err = processor.process(event).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_handler_validation_failure_marks_failed() {
        let (store, processor) = setup();
        let event = sample_event(EventType::OrderReady, json!({ "orderId": "o1" }));

        let err = processor.process(event).await.unwrap_err();

        assert!(matches!(err, AppError::EventFailed(_)));
        assert!(err.is_server_error());
        assert_eq!(
            store.status_history("evt1").await,
            vec![EventStatus::Processing, EventStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_process_event_by_id() {
        let (store, processor) = setup();
        let mut event = completed_event();
        event.status = Some(EventStatus::Queued);
        store.insert_event(event).await;

        let outcome = processor.process_event_by_id("evt1").await.unwrap();

        assert_eq!(outcome.result.notification_ids.len(), 2);
        assert_eq!(store.event_status("evt1").await, Some(EventStatus::Processed));
    }

    #[tokio::test]
    async fn test_missing_event_records_nothing() {
        let (store, processor) = setup();

        let err = processor.process_event_by_id("nope").await.unwrap_err();

        assert_eq!(err.to_string(), "Not found: Event nope not found");
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_event() {
        let (store, processor) = setup();
        store.fail_saves_for("u1").await;

        let err = processor.process(completed_event()).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(store.event_status("evt1").await, Some(EventStatus::Failed));
    }
}
