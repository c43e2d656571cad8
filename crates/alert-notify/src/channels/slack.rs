//! Slack incoming webhook channel.

use async_trait::async_trait;
use serde::Serialize;

use super::ChannelHandler;
use crate::classify::{ensure_success_status, snippet, MAX_SNIPPET_LENGTH};
use crate::config::NotifyConfig;
use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::{Alert, Severity};
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

/// Body Slack returns when it accepts a webhook post.
const SLACK_OK: &str = "ok";

/// Slack incoming webhook handler (type code 8).
///
/// The receiver's credential is the full webhook URL.
pub struct SlackHandler {
    client: WebhookClient,
    title: String,
}

impl SlackHandler {
    #[must_use]
    pub fn new(config: &NotifyConfig, client: WebhookClient) -> Self {
        Self {
            client,
            title: config.title.clone(),
        }
    }

    /// Format an alert as a Slack webhook payload.
    fn format_payload(&self, receiver: &NoticeReceiver, content: &str, alert: &Alert) -> SlackPayload {
        let color = match alert.severity {
            Severity::Info => "#3498db",      // Blue
            Severity::Warning => "#f39c12",   // Orange
            Severity::Critical => "#e74c3c",  // Red
            Severity::Emergency => "#8e44ad", // Purple
        };

        let attachment = SlackAttachment {
            fallback: format!("{}: {}", self.title, alert.target),
            color: color.to_string(),
            title: self.title.clone(),
            text: content.to_string(),
            footer: Some(format!(
                "{} | {}",
                alert.severity.as_str(),
                alert.fired_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            ts: Some(alert.fired_at.timestamp()),
        };

        SlackPayload {
            text: Self::format_mentions(receiver),
            attachments: vec![attachment],
        }
    }

    /// `<!channel>` and `<@U123>` tags for the receiver's routing metadata.
    fn format_mentions(receiver: &NoticeReceiver) -> Option<String> {
        let routing = &receiver.routing;
        let mut tags: Vec<String> = routing
            .at_user_ids
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect();
        if routing.at_all {
            tags.insert(0, "<!channel>".to_string());
        }

        if tags.is_empty() {
            None
        } else {
            Some(tags.join(" "))
        }
    }
}

#[async_trait]
impl ChannelHandler for SlackHandler {
    fn channel_type(&self) -> ChannelType {
        ChannelType::SlackWebhook
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
        let webhook_url = receiver.require_credential()?;
        WebhookRequest::post_json(webhook_url, &self.format_payload(receiver, content, alert))
    }

    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome {
        ensure_success_status(self.channel_type(), reply)?;

        let body = reply.body.as_deref().ok_or_else(NotifyError::empty_body)?;
        if body.trim() == SLACK_OK {
            return Ok(());
        }

        Err(NotifyError::PlatformRejection {
            channel: self.channel_type().name(),
            status: reply.status,
            code: None,
            message: snippet(body.trim(), MAX_SNIPPET_LENGTH),
        })
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fallback: String,
    color: String,
    title: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}
