//! Push delivery through an external gateway.

mod fcm;

pub use fcm::{
    AssertionClaims, FCM_SCOPE, FcmGateway, JWT_BEARER_GRANT, build_assertion, build_message,
};

use std::sync::Arc;

use async_trait::async_trait;
use dealdrop_common::AppResult;
use dealdrop_db::entities::notification_record::Priority;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::NotificationMessage;
use crate::store::RecordStore;

/// Whether the gateway talks to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMode {
    /// Real sends.
    Live,
    /// No credentials configured: every token succeeds without a network call.
    Simulation,
}

/// Outcome for one device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResult {
    /// The device token
    pub token: String,
    /// Whether the provider accepted the message
    pub success: bool,
    /// Provider message id on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Provider or transport error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenResult {
    /// A successful send.
    #[must_use]
    pub fn sent(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// A failed send.
    #[must_use]
    pub fn failed(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-token results of one send batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    /// One entry per token, in request order
    pub results: Vec<TokenResult>,
}

impl SendReport {
    /// Every token failed with the same error.
    #[must_use]
    pub fn all_failed(tokens: &[String], error: &str) -> Self {
        Self {
            results: tokens
                .iter()
                .map(|t| TokenResult::failed(t.clone(), error))
                .collect(),
        }
    }

    /// Tokens attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// Tokens that succeeded.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// First message id returned by the provider.
    #[must_use]
    pub fn first_message_id(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.message_id.as_deref())
    }

    /// Raw report as stored in the delivery log.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.results).unwrap_or(Value::Null)
    }
}

/// Sends one message to a batch of device tokens.
///
/// Per-token failures are data in the [`SendReport`]. An `Err` means the
/// gateway could not attempt the batch at all, e.g. because its credentials
/// are unusable.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Send `message` to every token.
    async fn send(
        &self,
        tokens: &[String],
        message: &NotificationMessage,
        priority: Priority,
    ) -> AppResult<SendReport>;

    /// Live or simulated.
    fn mode(&self) -> PushMode;

    /// Provider name recorded in delivery logs.
    fn provider(&self) -> &'static str {
        "fcm"
    }
}

/// Shared handle to a push gateway.
pub type SharedPushGateway = Arc<dyn PushGateway>;

/// Feed a send report back into token health.
pub async fn process_send_report(store: &dyn RecordStore, report: &SendReport) -> AppResult<()> {
    for result in &report.results {
        if result.success {
            store.mark_token_success(&result.token).await?;
        } else {
            let reason = result.error.as_deref().unwrap_or("unknown error");
            debug!(token = %result.token, reason, "Device token send failed");
            store.mark_token_failed(&result.token, reason).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    #[test]
    fn test_report_counts() {
        let report = SendReport {
            results: vec![
                TokenResult::failed("a", "UNREGISTERED"),
                TokenResult::sent("b", "projects/p/messages/1"),
                TokenResult::sent("c", "projects/p/messages/2"),
            ],
        };

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.first_message_id(), Some("projects/p/messages/1"));
        assert_eq!(report.to_json()[0]["error"], "UNREGISTERED");
    }

    #[tokio::test]
    async fn test_process_send_report_updates_tokens() {
        let store = MemoryRecordStore::new();
        store.add_token_with_failures("u1", "good", 2).await;
        store.add_token("u1", "bad").await;

        let report = SendReport {
            results: vec![
                TokenResult::sent("good", "m1"),
                TokenResult::failed("bad", "UNREGISTERED"),
            ],
        };
        process_send_report(&store, &report).await.unwrap();

        assert_eq!(store.token("good").await.unwrap().consecutive_failures, 0);
        let bad = store.token("bad").await.unwrap();
        assert_eq!(bad.consecutive_failures, 1);
        assert_eq!(bad.last_failure_reason.as_deref(), Some("UNREGISTERED"));
    }
}
