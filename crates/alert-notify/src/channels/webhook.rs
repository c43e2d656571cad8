//! Generic HTTP webhook channel.
//!
//! The receiver's credential is the full URL. A template that renders to
//! JSON is posted as-is; anything else is wrapped together with the alert.
//! A 2xx must carry a JSON body; an object with a non-zero `errcode`/`code`
//! is a rejection.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::ChannelHandler;
use crate::classify::{decode_body, ensure_success_status, platform_message};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

/// Generic webhook handler (type code 2).
pub struct WebhookHandler {
    client: WebhookClient,
    title: String,
}

impl WebhookHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            title: config.title.clone(),
        }
    }
}

#[async_trait]
impl ChannelHandler for WebhookHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Webhook
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
        let url = receiver.require_credential()?;

        match serde_json::from_str::<Value>(content) {
            Ok(body @ (Value::Object(_) | Value::Array(_))) => WebhookRequest::post_json(url, &body),
            _ => WebhookRequest::post_json(
                url,
                &WebhookEnvelope {
                    title: &self.title,
                    content,
                    alert,
                },
            ),
        }
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        ensure_success_status(self.channel_type(), reply)?;

        let Value::Object(body) = decode_body::<Value>(reply)? else {
            return Ok(());
        };

        let code = body
            .get("errcode")
            .or_else(|| body.get("code"))
            .and_then(Value::as_i64);

        match code {
            None | Some(0) => Ok(()),
            Some(code) => {
                let message = ["errmsg", "msg", "message"]
                    .iter()
                    .find_map(|key| body.get(*key).and_then(Value::as_str))
                    .map(ToString::to_string);

                Err(NotifyError::PlatformRejection {
                    channel: self.channel_type().name(),
                    status: reply.status,
                    code: Some(code),
                    message: platform_message(message, Some(code)),
                })
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookEnvelope<'a> {
    title: &'a str,
    content: &'a str,
    alert: &'a Alert,
}
