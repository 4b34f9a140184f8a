//! Notification dispatcher.
//!
//! Resolves device tokens, sends through the push gateway, writes the
//! notification record and delivery log, and feeds token health back into
//! the store. Recipients are handled one at a time and, per recipient, in
//! the order tokens, record, log.

use std::collections::HashSet;

use dealdrop_common::{AppResult, FanoutFailurePolicy};
use dealdrop_db::entities::notification_record::Priority;
use tracing::{debug, info, warn};

use crate::domain::{
    DeliveryChannel, DeliveryStatus, DispatchResult, NewDeliveryLog, NewNotificationRecord,
    NotificationDraft, NotificationMessage, Recipient,
};
use crate::push::{PushMode, SharedPushGateway, process_send_report};
use crate::store::SharedRecordStore;

/// Reason reported when a geospatial send finds nobody in range.
pub const NO_NEARBY_USERS: &str = "no nearby users";

/// Central delivery orchestrator used by every handler.
#[derive(Clone)]
pub struct NotificationService {
    store: SharedRecordStore,
    gateway: SharedPushGateway,
    fanout_policy: FanoutFailurePolicy,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(
        store: SharedRecordStore,
        gateway: SharedPushGateway,
        fanout_policy: FanoutFailurePolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            fanout_policy,
        }
    }

    /// The record store this service writes to.
    #[must_use]
    pub fn store(&self) -> &SharedRecordStore {
        &self.store
    }

    /// Live or simulated push.
    #[must_use]
    pub fn push_mode(&self) -> PushMode {
        self.gateway.mode()
    }

    /// Notify one user.
    ///
    /// A record is written even when the user has no deliverable tokens. A
    /// delivery log entry is written only when tokens were attempted.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        message: &NotificationMessage,
        draft: NotificationDraft,
        priority: Priority,
    ) -> AppResult<DispatchResult> {
        let tokens: Vec<String> = self
            .store
            .active_tokens_for_user(user_id)
            .await?
            .into_iter()
            .map(|t| t.token)
            .collect();

        let report = if tokens.is_empty() {
            debug!(user_id = %user_id, "No deliverable device tokens, recording in-app only");
            None
        } else {
            let report = self.gateway.send(&tokens, message, priority).await?;
            process_send_report(self.store.as_ref(), &report).await?;
            Some(report)
        };

        let record = NewNotificationRecord::compose(user_id, message, draft, priority);
        let notification_id = self.store.save_notification(record).await?;

        let (fcm_sent, fcm_success) = match &report {
            Some(report) => {
                let succeeded = report.success_count();
                let status = if succeeded > 0 {
                    DeliveryStatus::Sent
                } else {
                    DeliveryStatus::Failed
                };
                self.store
                    .append_delivery_log(NewDeliveryLog {
                        notification_id: notification_id.clone(),
                        channel: DeliveryChannel::Push,
                        status,
                        provider: self.gateway.provider().to_string(),
                        provider_message_id: report.first_message_id().map(ToString::to_string),
                        provider_response: report.to_json(),
                    })
                    .await?;
                (report.attempted(), succeeded)
            }
            None => (0, 0),
        };

        debug!(
            user_id = %user_id,
            notification_id = %notification_id,
            fcm_sent,
            fcm_success,
            "Notification dispatched"
        );

        Ok(DispatchResult {
            recipients: 1,
            fcm_sent,
            fcm_success,
            notification_ids: vec![notification_id],
            ..DispatchResult::default()
        })
    }

    /// Notify several users in sequence with per-recipient content.
    ///
    /// Under [`FanoutFailurePolicy::Abort`] the first error stops the batch
    /// and is returned. Under [`FanoutFailurePolicy::Continue`] the failed
    /// recipient is listed in `failed_recipients` and the batch goes on.
    pub async fn send_to_multiple_users<M, D>(
        &self,
        recipients: Vec<Recipient>,
        message_fn: M,
        draft_fn: D,
        priority: Priority,
    ) -> AppResult<DispatchResult>
    where
        M: Fn(&Recipient) -> NotificationMessage + Send + Sync,
        D: Fn(&Recipient) -> NotificationDraft + Send + Sync,
    {
        let mut total = DispatchResult::default();

        for recipient in &recipients {
            let message = message_fn(recipient);
            let draft = draft_fn(recipient);

            match self
                .send_to_user(&recipient.user_id, &message, draft, priority)
                .await
            {
                Ok(result) => total.merge(result),
                Err(e) => match self.fanout_policy {
                    FanoutFailurePolicy::Abort => return Err(e),
                    FanoutFailurePolicy::Continue => {
                        warn!(
                            user_id = %recipient.user_id,
                            error = %e,
                            "Recipient failed, continuing with remaining recipients"
                        );
                        total.push_failed(recipient.user_id.clone());
                    }
                },
            }
        }

        Ok(total)
    }

    /// Notify every user within `radius_km` of a point.
    ///
    /// Each recipient's distance and location type are passed to the
    /// generators. A user with several stored locations is notified once, for
    /// the nearest one. When nobody is in range the gateway is not called.
    pub async fn send_location_based_notifications<M, D>(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        message_fn: M,
        draft_fn: D,
        priority: Priority,
    ) -> AppResult<DispatchResult>
    where
        M: Fn(&Recipient) -> NotificationMessage + Send + Sync,
        D: Fn(&Recipient) -> NotificationDraft + Send + Sync,
    {
        let mut users = self
            .store
            .find_users_within_radius(latitude, longitude, radius_km)
            .await;
        // Rows come nearest first; keep one per user.
        let mut seen = HashSet::new();
        users.retain(|u| seen.insert(u.user_id.clone()));

        if users.is_empty() {
            info!(latitude, longitude, radius_km, "No nearby users for location-based send");
            return Ok(DispatchResult::skipped(NO_NEARBY_USERS));
        }

        info!(
            recipients = users.len(),
            radius_km, "Sending location-based notifications"
        );
        let recipients = users.into_iter().map(Recipient::from).collect();
        self.send_to_multiple_users(recipients, message_fn, draft_fn, priority)
            .await
    }
}
