//! DingTalk custom robot channel.
//!
//! Endpoint: `{dingtalk_webhook_url}{access_token}`, optionally signed with
//! the receiver's secret (`timestamp` + `sign` query parameters).
//! Replies with `{"errcode": 0, "errmsg": "ok"}` on success.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::{append_mentions, ChannelHandler};
use crate::classify::{decode_body, ensure_success_status, ErrcodeReply};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

type HmacSha256 = Hmac<Sha256>;

/// DingTalk robot handler (type code 5).
pub struct DingTalkHandler {
    client: WebhookClient,
    webhook_url: String,
    title: String,
}

impl DingTalkHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            webhook_url: config.dingtalk_webhook_url.clone(),
            title: config.title.clone(),
        }
    }

    /// Compute the robot signature: base64(HMAC-SHA256(secret, "{timestamp}\n{secret}")).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the secret cannot key the MAC.
    pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, NotifyError> {
        let string_to_sign = format!("{timestamp_ms}\n{secret}");
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotifyError::configuration(format!("invalid dingtalk secret: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn format_payload<'a>(&'a self, receiver: &'a NoticeReceiver, content: &str) -> DingTalkPayload<'a> {
        let routing = &receiver.routing;
        let text = append_mentions(
            content,
            routing.at_mobiles.iter().chain(&routing.at_user_ids),
            |m| format!("@{m}"),
        );

        DingTalkPayload {
            msgtype: "markdown",
            markdown: DingTalkMarkdown {
                title: &self.title,
                text,
            },
            at: DingTalkAt {
                is_at_all: routing.at_all,
                at_mobiles: &routing.at_mobiles,
                at_user_ids: &routing.at_user_ids,
            },
        }
    }
}

#[async_trait]
impl ChannelHandler for DingTalkHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::DingTalkRobot
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
        let payload = self.format_payload(receiver, content);
        let mut request = WebhookRequest::post_json(&format!("{}{token}", self.webhook_url), &payload)?;

        if let Some(secret) = receiver.signing_secret() {
            let timestamp = Utc::now().timestamp_millis();
            let sign = Self::sign(secret, timestamp)?;
            request
                .url
                .query_pairs_mut()
                .append_pair("timestamp", &timestamp.to_string())
                .append_pair("sign", &sign);
        }

        Ok(request)
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        ensure_success_status(self.channel_type(), reply)?;
        decode_body::<ErrcodeReply>(reply)?.into_outcome(self.channel_type(), reply.status)
    }
}

// =============================================================================
// DingTalk API types
// =============================================================================

#[derive(Debug, Serialize)]
struct DingTalkPayload<'a> {
    msgtype: &'static str,
    markdown: DingTalkMarkdown<'a>,
    at: DingTalkAt<'a>,
}

#[derive(Debug, Serialize)]
struct DingTalkMarkdown<'a> {
    title: &'a str,
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DingTalkAt<'a> {
    is_at_all: bool,
    at_mobiles: &'a [String],
    at_user_ids: &'a [String],
}
