//! Discord REST delivery.
//!
//! Posts an embed to `POST /channels/{channel_id}/messages` and maps the HTTP
//! outcome onto [`DeliveryError`]:
//! - 2xx → delivered
//! - 403 / 404 → permanent (channel deleted, bot removed or muted)
//! - 429 → transient, honouring `retry_after`
//! - anything else, including network errors and timeouts → transient

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use cqc_common::error::DeliveryError;
use cqc_common::types::{ChannelId, NotificationPayload};

use crate::MessageSender;

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Discord bot client for channel messages.
pub struct DiscordSender {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl DiscordSender {
    pub fn new(api_base: String, bot_token: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cqc-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    fn message_url(&self, channel_id: ChannelId) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

#[async_trait]
impl MessageSender for DiscordSender {
    async fn send(
        &self,
        channel_id: ChannelId,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let body = CreateMessage {
            embeds: [Embed {
                title: &payload.title,
                description: &payload.body,
                color: payload.color,
                footer: payload.footer.as_deref().map(|text| EmbedFooter { text }),
            }],
        };

        let response = self
            .client
            .post(self.message_url(channel_id))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::transient("request timed out")
                } else {
                    DeliveryError::transient(format!("request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(channel_id = %channel_id, "Message delivered");
            return Ok(());
        }

        let header_retry = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok());
        let text = response.text().await.unwrap_or_default();

        Err(classify_failure(status, &text, header_retry))
    }

    fn name(&self) -> &str {
        "discord"
    }
}

/// Map a non-success HTTP response onto a delivery error.
pub fn classify_failure(
    status: StatusCode,
    body: &str,
    header_retry_after: Option<f64>,
) -> DeliveryError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            DeliveryError::Permanent(format!("{}: {}", status, truncate(body, 200)))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = serde_json::from_str::<RateLimitBody>(body)
                .ok()
                .and_then(|b| b.retry_after)
                .or(header_retry_after)
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64);
            DeliveryError::Transient {
                reason: "rate limited".to_string(),
                retry_after,
            }
        }
        _ => DeliveryError::transient(format!("{}: {}", status, truncate(body, 200))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
