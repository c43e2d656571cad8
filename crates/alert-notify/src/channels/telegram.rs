//! Telegram Bot API channel.
//!
//! Endpoint: `{telegram_api_url}/bot{token}/sendMessage`, with the chat id
//! taken from the receiver's target. Unlike the robot webhooks, Telegram
//! reports failures with a 4xx status and an `{"ok": false}` body, so the
//! classifier reads the body on both paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ChannelHandler;
use crate::classify::{decode_body, ensure_success_status, platform_message};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

/// Telegram bot handler (type code 7).
pub struct TelegramHandler {
    client: WebhookClient,
    api_url: String,
}

impl TelegramHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            api_url: config.telegram_api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChannelHandler for TelegramHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::TelegramBot
    }

    fn client(&self) -> &WebhookClient {
        &self.client
    }

    fn build_request(
        &self,
        receiver: &NoticeReceiver,
        content: &str,
        _alert: &Alert,
    ) -> Result<WebhookRequest, NotifyError> {
        let token = receiver.require_credential()?;
        let chat_id = receiver.require_target()?;

        let payload = TelegramMessage {
            chat_id,
            text: content,
            disable_web_page_preview: true,
        };

        WebhookRequest::post_json(
            &format!("{}/bot{token}/sendMessage", self.api_url),
            &payload,
        )
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        if !reply.is_success() {
            // Prefer Telegram's own description when the error body parses.
            return match decode_body::<TelegramReply>(reply) {
                Ok(body) if body.description.is_some() => Err(NotifyError::PlatformRejection {
                    channel: self.channel_type().name(),
                    status: reply.status,
                    code: body.error_code,
                    message: format!(
                        "HTTP status {}: {}",
                        reply.status,
                        platform_message(body.description, body.error_code)
                    ),
                }),
                _ => ensure_success_status(self.channel_type(), reply),
            };
        }

        let body: TelegramReply = decode_body(reply)?;
        if body.ok {
            return Ok(());
        }

        Err(NotifyError::PlatformRejection {
            channel: self.channel_type().name(),
            status: reply.status,
            code: body.error_code,
            message: platform_message(body.description, body.error_code),
        })
    }
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    #[serde(default)]
    ok: bool,
    error_code: Option<i64>,
    description: Option<String>,
}
