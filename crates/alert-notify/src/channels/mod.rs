//! Channel handler implementations.

pub mod dingtalk;
pub mod discord;
pub mod feishu;
pub mod slack;
pub mod telegram;
pub mod webhook;
pub mod wework;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{DeliveryOutcome, NotifyError};
use crate::events::Alert;
use crate::receiver::{ChannelType, NoticeReceiver};
use crate::template::{self, NoticeTemplate};
use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};

pub use dingtalk::DingTalkHandler;
pub use discord::DiscordHandler;
pub use feishu::FeishuHandler;
pub use slack::SlackHandler;
pub use telegram::TelegramHandler;
pub use webhook::WebhookHandler;
pub use wework::WeWorkHandler;

/// Delivery for one channel type.
///
/// Implementations only describe the platform: how to build the request
/// and how to read the reply. [`ChannelHandler::send`] ties them together
/// with the shared renderer and HTTP client, so handlers never substitute
/// templates or talk to the network themselves.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Registry key of this handler.
    fn channel_type(&self) -> ChannelType;

    /// HTTP client used for the single POST.
    fn client(&self) -> &WebhookClient;

    /// Build the platform request from already rendered text.
    ///
    /// Pure: validates the receiver and returns a request value.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Configuration`] for an unusable receiver.
    fn build_request(
        &self,
        receiver: &NoticeReceiver,
        content: &str,
        alert: &Alert,
    ) -> Result<WebhookRequest, NotifyError>;

    /// Decide whether the platform accepted the message.
    ///
    /// # Errors
    ///
    /// [`NotifyError::PlatformRejection`] or [`NotifyError::Transport`].
    fn classify(&self, reply: &WebhookReply) -> DeliveryOutcome;

    /// Render, build, POST once, classify.
    async fn send(
        &self,
        receiver: &NoticeReceiver,
        template: &NoticeTemplate,
        alert: &Alert,
    ) -> DeliveryOutcome {
        let channel = self.channel_type().name();

        let content = template::render(template, alert)?;
        let request = self.build_request(receiver, &content, alert)?;

        debug!(channel, receiver = %receiver.name, "Sending notification");

        let reply = match self.client().execute(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(channel, receiver = %receiver.name, error = %e, "Webhook request failed");
                return Err(e);
            }
        };

        match self.classify(&reply) {
            Ok(()) => {
                debug!(channel, receiver = %receiver.name, "Notification sent successfully");
                Ok(())
            }
            Err(e) => {
                warn!(
                    channel,
                    receiver = %receiver.name,
                    status = reply.status,
                    error = %e,
                    "Notification not accepted"
                );
                Err(e)
            }
        }
    }
}

/// Text mentions appended to a message body, e.g. `@138...` for DingTalk.
pub(crate) fn append_mentions<'a>(
    content: &str,
    mentions: impl IntoIterator<Item = &'a String>,
    render_tag: impl Fn(&str) -> String,
) -> String {
    let tags: Vec<String> = mentions.into_iter().map(|m| render_tag(m)).collect();
    if tags.is_empty() {
        content.to_string()
    } else {
        format!("{content}\n\n{}", tags.join(" "))
    }
}
