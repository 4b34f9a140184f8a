//! Firebase Cloud Messaging HTTP v1 gateway.
//!
//! Each batch authenticates from scratch: a service-account assertion is
//! signed with RS256, exchanged for an access token, and the token is used
//! for one `messages:send` call per device token. Access tokens are not
//! cached between batches.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dealdrop_common::crypto::normalize_pem;
use dealdrop_common::{AppError, AppResult, IdGenerator, PushConfig};
use dealdrop_db::entities::notification_record::Priority;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{PushGateway, PushMode, SendReport, TokenResult};
use crate::domain::NotificationMessage;

/// OAuth scope for sending messages.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Grant type for the assertion exchange.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime in seconds.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Claims of the service-account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service-account email
    pub iss: String,
    /// Requested scope
    pub scope: String,
    /// Token endpoint
    pub aud: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, `iat + 3600`
    pub exp: i64,
}

/// Sign a service-account assertion issued at `now`.
///
/// # Errors
///
/// Returns [`AppError::Config`] if the private key cannot be parsed.
pub fn build_assertion(credentials: &PushConfig, now: i64) -> AppResult<String> {
    let key = EncodingKey::from_rsa_pem(normalize_pem(&credentials.private_key).as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid service account private key: {e}")))?;

    let claims = AssertionClaims {
        iss: credentials.client_email.clone(),
        scope: FCM_SCOPE.to_string(),
        aud: credentials.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::Config(format!("Failed to sign assertion: {e}")))
}

/// Build the `messages:send` request body for one token.
#[must_use]
pub fn build_message(token: &str, message: &NotificationMessage, priority: Priority) -> Value {
    let mut notification = json!({
        "title": message.title,
        "body": message.body,
    });
    if let Some(image) = &message.image_url {
        notification["image"] = json!(image);
    }

    let android_priority = if priority == Priority::Urgent {
        "high"
    } else {
        "normal"
    };
    let mut android = json!({ "priority": android_priority });
    if let Some(url) = &message.action_url {
        android["notification"] = json!({ "click_action": url });
    }

    json!({
        "message": {
            "token": token,
            "notification": notification,
            "data": message.data,
            "android": android,
            "apns": {
                "payload": {
                    "aps": {
                        "alert": {
                            "title": message.title,
                            "body": message.body,
                        },
                        "sound": "default",
                        "badge": 1,
                    }
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// FCM gateway. Without credentials it runs in simulation mode.
#[derive(Clone)]
pub struct FcmGateway {
    credentials: Option<PushConfig>,
    http: reqwest::Client,
    id_gen: IdGenerator,
}

impl FcmGateway {
    /// Create a gateway; `None` selects simulation mode.
    pub fn new(credentials: Option<PushConfig>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        match &credentials {
            Some(c) => info!(project_id = %c.project_id, "Push gateway running in live mode"),
            None => info!(
                "No push credentials configured, push gateway running in simulation mode"
            ),
        }

        Ok(Self {
            credentials,
            http,
            id_gen: IdGenerator::new(),
        })
    }

    /// A gateway that never touches the network.
    #[must_use]
    pub fn simulation() -> Self {
        Self {
            credentials: None,
            http: reqwest::Client::new(),
            id_gen: IdGenerator::new(),
        }
    }

    fn simulate(&self, tokens: &[String]) -> SendReport {
        debug!(tokens = tokens.len(), "Simulating push send");
        SendReport {
            results: tokens
                .iter()
                .map(|t| {
                    TokenResult::sent(t.clone(), format!("simulated-{}", self.id_gen.generate()))
                })
                .collect(),
        }
    }

    async fn fetch_access_token(
        &self,
        credentials: &PushConfig,
        assertion: &str,
    ) -> AppResult<String> {
        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Token exchange failed with status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn send_one(
        &self,
        url: &str,
        access_token: &str,
        token: &str,
        body: &Value,
    ) -> TokenResult {
        let response = match self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return TokenResult::failed(token, format!("Transport error: {e}")),
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return match body.get("name").and_then(Value::as_str) {
                Some(name) => TokenResult::sent(token, name),
                None => TokenResult::failed(token, "Response missing message name"),
            };
        }

        let code = body.pointer("/error/status").and_then(Value::as_str);
        let detail = body.pointer("/error/message").and_then(Value::as_str);
        let reason = match (code, detail) {
            (Some(code), Some(detail)) => format!("{code}: {detail}"),
            (Some(code), None) => code.to_string(),
            _ => format!("HTTP {status}"),
        };
        TokenResult::failed(token, reason)
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(
        &self,
        tokens: &[String],
        message: &NotificationMessage,
        priority: Priority,
    ) -> AppResult<SendReport> {
        let Some(credentials) = &self.credentials else {
            return Ok(self.simulate(tokens));
        };

        let assertion = build_assertion(credentials, Utc::now().timestamp())?;
        let access_token = match self.fetch_access_token(credentials, &assertion).await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    error = %e,
                    tokens = tokens.len(),
                    "Push token exchange failed, failing batch"
                );
                return Ok(SendReport::all_failed(tokens, &e.to_string()));
            }
        };

        let url = format!(
            "{}/v1/projects/{}/messages:send",
            credentials.api_base_url.trim_end_matches('/'),
            credentials.project_id
        );

        let mut results = Vec::with_capacity(tokens.len());
        for token in tokens {
            let body = build_message(token, message, priority);
            results.push(self.send_one(&url, &access_token, token, &body).await);
        }

        let report = SendReport { results };
        debug!(
            attempted = report.attempted(),
            succeeded = report.success_count(),
            "Push batch sent"
        );
        Ok(report)
    }

    fn mode(&self) -> PushMode {
        if self.credentials.is_some() {
            PushMode::Live
        } else {
            PushMode::Simulation
        }
    }
}
