//! Feishu / Lark custom bot channel.
//!
//! Sends a `post` rich-text message to `{feishu_webhook_url}{token}`.
//! When the receiver has a secret the body carries `timestamp` and `sign`,
//! where `sign` is base64(HMAC-SHA256 keyed by "{timestamp}\n{secret}" over
//! an empty message).

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::ChannelHandler;
use crate::classify::{decode_body, ensure_success_status, platform_message};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

/// Feishu robot handler (type code 6).
pub struct FeishuHandler {
    client: WebhookClient,
    webhook_url: String,
    title: String,
}

impl FeishuHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            webhook_url: config.feishu_webhook_url.clone(),
            title: config.title.clone(),
        }
    }

    /// Compute the bot signature for `timestamp` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the secret cannot key the MAC.
    pub fn sign(secret: &str, timestamp: i64) -> Result<String, NotifyError> {
        let key = format!("{timestamp}\n{secret}");
        let mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
            .map_err(|e| NotifyError::configuration(format!("invalid feishu secret: {e}")))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn format_payload(&self, receiver: &NoticeReceiver, content: &str) -> FeishuPayload {
        let routing = &receiver.routing;
        let mut line = vec![FeishuElement::Text {
            text: content.to_string(),
        }];
        line.extend(routing.at_user_ids.iter().map(|id| FeishuElement::At {
            user_id: id.clone(),
        }));
        if routing.at_all {
            line.push(FeishuElement::At {
                user_id: "all".to_string(),
            });
        }

        FeishuPayload {
            msg_type: "post",
            content: FeishuContent {
                post: FeishuPost {
                    zh_cn: FeishuPostBody {
                        title: self.title.clone(),
                        content: vec![line],
                    },
                },
            },
            timestamp: None,
            sign: None,
        }
    }
}

#[async_trait]
impl ChannelHandler for FeishuHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::FeishuRobot
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
        let mut payload = self.format_payload(receiver, content);

        if let Some(secret) = receiver.signing_secret() {
            let timestamp = Utc::now().timestamp();
            payload.sign = Some(Self::sign(secret, timestamp)?);
            payload.timestamp = Some(timestamp.to_string());
        }

        WebhookRequest::post_json(&format!("{}{token}", self.webhook_url), &payload)
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        ensure_success_status(self.channel_type(), reply)?;
        let body: FeishuReply = decode_body(reply)?;

        // Older deployments answer with StatusCode/StatusMessage only.
        let code = body.code.or(body.status_code);
        match code {
            Some(0) => Ok(()),
            code => Err(NotifyError::PlatformRejection {
                channel: self.channel_type().name(),
                status: reply.status,
                code,
                message: platform_message(body.msg.or(body.status_message), code),
            }),
        }
    }
}

// =============================================================================
// Feishu API types
// =============================================================================

#[derive(Debug, Serialize)]
struct FeishuPayload {
    msg_type: &'static str,
    content: FeishuContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sign: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeishuContent {
    post: FeishuPost,
}

#[derive(Debug, Serialize)]
struct FeishuPost {
    zh_cn: FeishuPostBody,
}

#[derive(Debug, Serialize)]
struct FeishuPostBody {
    title: String,
    content: Vec<Vec<FeishuElement>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
enum FeishuElement {
    Text { text: String },
    At { user_id: String },
}

#[derive(Debug, Deserialize)]
struct FeishuReply {
    code: Option<i64>,
    msg: Option<String>,
    #[serde(rename = "StatusCode")]
    status_code: Option<i64>,
    #[serde(rename = "StatusMessage")]
    status_message: Option<String>,
}
