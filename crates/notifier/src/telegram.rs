//! Telegram Bot API delivery over plain HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::sink::{DeliveryError, DeliverySink, Message};

const API_BASE_URL: &str = "https://api.telegram.org";

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl TelegramSink {
    pub fn new(token: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Point the sink at a different API host (a local Bot API server, or a
    /// stub in tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        let reply = response.json::<ApiReply>().await.ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiReply { description, .. }) => Err(DeliveryError::classify(
                Some(status.as_u16()),
                &description.unwrap_or_else(|| status.to_string()),
            )),
            None => Err(DeliveryError::classify(
                Some(status.as_u16()),
                &format!("{} returned unreadable body with status {}", method, status),
            )),
        }
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": message.chat_id,
                "text": message.text,
                "parse_mode": "HTML",
            }),
        )
        .await?;

        if let Some(sticker) = &message.sticker {
            let sent = self
                .call(
                    "sendSticker",
                    json!({ "chat_id": message.chat_id, "sticker": sticker }),
                )
                .await;
            if let Err(e) = sent {
                tracing::warn!(chat_id = message.chat_id, error = %e, "Failed to send sticker");
            }
        }

        tracing::debug!(chat_id = message.chat_id, "Message delivered");
        Ok(())
    }
}
