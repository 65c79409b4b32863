//! Outbound reminder delivery.
//!
//! [`TelegramSink`] posts messages through the Telegram Bot API; [`LogSink`]
//! only logs them and is used when no bot token is configured.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dao::models::ParticipantId;

/// Default Telegram Bot API base URL.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Error descriptions Telegram returns for recipients that can never be reached.
const UNREACHABLE_MARKERS: [&str; 3] = ["chat not found", "user is deactivated", "bot was blocked"];

/// Why a message could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Worth retrying later (network trouble, rate limiting, server errors).
    #[error("transient delivery failure: {0}")]
    Transient(String),
    /// The recipient cannot be reached; retrying will not help.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Permanent(_))
    }
}

/// Destination for rendered reminder messages.
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` to `recipient`. Unclassified failures must be reported
    /// as [`DeliveryError::Transient`].
    fn send(
        &self,
        recipient: ParticipantId,
        text: String,
    ) -> BoxFuture<'static, Result<(), DeliveryError>>;
}

/// Sink shared between the scheduler and its tests.
pub type SharedSink = Arc<dyn NotificationSink>;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    description: Option<String>,
}

/// Client for the Telegram Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    http: reqwest::Client,
    endpoint: Arc<str>,
}

impl TelegramSink {
    /// Build a sink for `token` against `api_url` (see [`TELEGRAM_API_URL`]).
    pub fn new(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        let endpoint = format!("{}/bot{token}/sendMessage", api_url.trim_end_matches('/'));
        debug!(api_url, "telegram sink initialized");
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    async fn deliver(&self, recipient: ParticipantId, text: String) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(self.endpoint.as_ref())
            .json(&SendMessage {
                chat_id: recipient.0,
                text: &text,
                parse_mode: "HTML",
            })
            .send()
            .await
            .map_err(|err| DeliveryError::Transient(err.to_string()))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            debug!(%recipient, "telegram message sent");
            return Ok(());
        }

        let body = response.json::<ApiResponse>().await.unwrap_or_default();
        let description = body.description.unwrap_or_default();
        let outcome = classify_failure(status, &description);
        warn!(%recipient, status, description = %description, "telegram API returned error");
        Err(outcome)
    }
}

impl NotificationSink for TelegramSink {
    fn send(
        &self,
        recipient: ParticipantId,
        text: String,
    ) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let sink = self.clone();
        Box::pin(async move { sink.deliver(recipient, text).await })
    }
}

/// Map a non-2xx Bot API answer onto the retry taxonomy.
pub fn classify_failure(status: u16, description: &str) -> DeliveryError {
    let lowered = description.to_ascii_lowercase();
    let unreachable = UNREACHABLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));

    if status == 403 || (status == 400 && unreachable) {
        DeliveryError::Permanent(format!("{status}: {description}"))
    } else {
        DeliveryError::Transient(format!("{status}: {description}"))
    }
}

/// Sink that only logs messages.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(
        &self,
        recipient: ParticipantId,
        text: String,
    ) -> BoxFuture<'static, Result<(), DeliveryError>> {
        Box::pin(async move {
            info!(%recipient, text = %text, "reminder (log only)");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_and_missing_chats_are_permanent() {
        assert!(classify_failure(403, "Forbidden: bot was blocked by the user").is_permanent());
        assert!(classify_failure(400, "Bad Request: chat not found").is_permanent());
        assert!(classify_failure(403, "").is_permanent());
    }

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(!classify_failure(429, "Too Many Requests: retry after 5").is_permanent());
        assert!(!classify_failure(502, "Bad Gateway").is_permanent());
        assert!(!classify_failure(400, "Bad Request: message is too long").is_permanent());
    }

    #[test]
    fn endpoint_includes_token_once() {
        let sink = TelegramSink::new(reqwest::Client::new(), "http://localhost:8081/", "123:abc");
        assert_eq!(
            sink.endpoint.as_ref(),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn send_message_payload_shape() {
        let payload = serde_json::to_value(SendMessage {
            chat_id: 42,
            text: "<b>hi</b>",
            parse_mode: "HTML",
        })
        .unwrap();
        assert_eq!(payload["chat_id"], 42);
        assert_eq!(payload["parse_mode"], "HTML");
    }
}
