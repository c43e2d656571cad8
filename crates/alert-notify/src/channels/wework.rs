//! WeCom (WeChat Work) group robot channel.
//!
//! Endpoint: `{wework_webhook_url}{key}`. Markdown messages cannot mention
//! anyone, so a receiver with mentions gets a `text` message instead.

use async_trait::async_trait;
use serde::Serialize;

use super::ChannelHandler;
use crate::classify::{decode_body, ensure_success_status, ErrcodeReply};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

const MENTION_ALL: &str = "@all";

/// WeCom robot handler (type code 4).
pub struct WeWorkHandler {
    client: WebhookClient,
    webhook_url: String,
}

impl WeWorkHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            webhook_url: config.wework_webhook_url.clone(),
        }
    }

    fn format_payload(receiver: &NoticeReceiver, content: &str) -> WeWorkPayload {
        let routing = &receiver.routing;
        if !routing.has_mentions() {
            return WeWorkPayload::Markdown {
                markdown: WeWorkMarkdown {
                    content: content.to_string(),
                },
            };
        }

        let mut mentioned_list = routing.at_user_ids.clone();
        if routing.at_all {
            mentioned_list.push(MENTION_ALL.to_string());
        }

        WeWorkPayload::Text {
            text: WeWorkText {
                content: content.to_string(),
                mentioned_list,
                mentioned_mobile_list: routing.at_mobiles.clone(),
            },
        }
    }
}

#[async_trait]
impl ChannelHandler for WeWorkHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::WeWorkRobot
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
        let key = receiver.require_credential()?;
        WebhookRequest::post_json(
            &format!("{}{key}", self.webhook_url),
            &Self::format_payload(receiver, content),
        )
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        ensure_success_status(self.channel_type(), reply)?;
        decode_body::<ErrcodeReply>(reply)?.into_outcome(self.channel_type(), reply.status)
    }
}

// =============================================================================
// WeCom API types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
enum WeWorkPayload {
    Markdown { markdown: WeWorkMarkdown },
    Text { text: WeWorkText },
}

#[derive(Debug, Serialize)]
struct WeWorkMarkdown {
    content: String,
}

#[derive(Debug, Serialize)]
struct WeWorkText {
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mentioned_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mentioned_mobile_list: Vec<String>,
}
