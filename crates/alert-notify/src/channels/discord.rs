//! Discord bot channel.
//!
//! Posts an embed to `{discord_api_url}/channels/{target}/messages` with
//! `Authorization: Bot {token}`. Discord answers with the created message;
//! anything without a message `id` is treated as a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ChannelHandler;
use crate::classify::{decode_body, ensure_success_status, platform_message};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

/// Discord bot handler (type code 9).
pub struct DiscordHandler {
    client: WebhookClient,
    api_url: String,
    title: String,
}

impl DiscordHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            api_url: config.discord_api_url.trim_end_matches('/').to_string(),
            title: config.title.clone(),
        }
    }

    /// Format an alert as a Discord message payload.
    fn format_payload(&self, receiver: &NoticeReceiver, content: &str, alert: &Alert) -> DiscordPayload {
        let routing = &receiver.routing;
        let mut mentions: Vec<String> = routing
            .at_user_ids
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect();
        if routing.at_all {
            mentions.insert(0, "@everyone".to_string());
        }

        DiscordPayload {
            content: (!mentions.is_empty()).then(|| mentions.join(" ")),
            embeds: vec![DiscordEmbed {
                title: self.title.clone(),
                description: content.to_string(),
                color: alert.severity.color(),
                timestamp: alert.fired_at.to_rfc3339(),
            }],
        }
    }
}

#[async_trait]
impl ChannelHandler for DiscordHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::DiscordBot
    }

    fn client(&self) -> &WebhookClient {
        &self.client
    }

    fn build_request(
        &self,
        receiver: &NoticeReceiver,
        content: &str,
        alert: &Alert,
    ) -> Result<WebhookRequest, NotifyError> {
        let token = receiver.require_credential()?;
        let channel_id = receiver.require_target()?;

        let request = WebhookRequest::post_json(
            &format!("{}/channels/{channel_id}/messages", self.api_url),
            &self.format_payload(receiver, content, alert),
        )?;

        Ok(request.with_header("Authorization", format!("Bot {token}")))
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        if !reply.is_success() {
            return match decode_body::<DiscordReply>(reply) {
                Ok(DiscordReply {
                    message: Some(message),
                    code,
                    ..
                }) => Err(NotifyError::PlatformRejection {
                    channel: self.channel_type().name(),
                    status: reply.status,
                    code,
                    message: format!("HTTP status {}: {message}", reply.status),
                }),
                _ => ensure_success_status(self.channel_type(), reply),
            };
        }

        let body: DiscordReply = decode_body(reply)?;
        if body.id.is_some() {
            return Ok(());
        }

        Err(NotifyError::PlatformRejection {
            channel: self.channel_type().name(),
            status: reply.status,
            code: body.code,
            message: platform_message(body.message, body.code),
        })
    }
}

// =============================================================================
// Discord API types
// =============================================================================

#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct DiscordReply {
    id: Option<String>,
    code: Option<i64>,
    message: Option<String>,
}
