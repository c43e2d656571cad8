//! Delivery targets and channel type codes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NotifyError;

/// Channel type codes understood by the built-in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelType {
    Webhook = 2,
    WeWorkRobot = 4,
    DingTalkRobot = 5,
    FeishuRobot = 6,
    TelegramBot = 7,
    SlackWebhook = 8,
    DiscordBot = 9,
}

impl ChannelType {
    /// All built-in channel types, ordered by code.
    pub const ALL: [Self; 7] = [
        Self::Webhook,
        Self::WeWorkRobot,
        Self::DingTalkRobot,
        Self::FeishuRobot,
        Self::TelegramBot,
        Self::SlackWebhook,
        Self::DiscordBot,
    ];

    /// Registry key for this channel.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short name used in logs and rejection messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::WeWorkRobot => "wework",
            Self::DingTalkRobot => "dingtalk",
            Self::FeishuRobot => "feishu",
            Self::TelegramBot => "telegram",
            Self::SlackWebhook => "slack",
            Self::DiscordBot => "discord",
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who gets mentioned alongside the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingMetadata {
    /// Phone numbers to mention (DingTalk, WeCom).
    pub at_mobiles: Vec<String>,
    /// Platform user ids to mention.
    pub at_user_ids: Vec<String>,
    /// Mention everyone in the group.
    pub at_all: bool,
}

impl RoutingMetadata {
    #[must_use]
    pub fn has_mentions(&self) -> bool {
        self.at_all || !self.at_mobiles.is_empty() || !self.at_user_ids.is_empty()
    }
}

/// One delivery target.
///
/// `credential` means different things per channel: a robot access token,
/// a full webhook URL or a bot token. `target` carries the chat/channel id
/// for bot APIs that need one (Telegram, Discord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeReceiver {
    pub name: String,
    pub channel_type: u8,
    pub credential: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Signing secret for robots that verify requests (DingTalk, Feishu).
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub routing: RoutingMetadata,
}

impl NoticeReceiver {
    #[must_use]
    pub fn new(name: impl Into<String>, channel_type: u8, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel_type,
            credential: credential.into(),
            target: None,
            secret: None,
            routing: RoutingMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_routing(mut self, routing: RoutingMetadata) -> Self {
        self.routing = routing;
        self
    }

    /// The credential, trimmed, or a configuration error if it is blank.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] when the credential is empty.
    pub fn require_credential(&self) -> Result<&str, NotifyError> {
        let credential = self.credential.trim();
        if credential.is_empty() {
            return Err(NotifyError::configuration(format!(
                "receiver '{}' has an empty credential",
                self.name
            )));
        }
        Ok(credential)
    }

    /// The chat/channel id, trimmed, or a configuration error if absent.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] when no target is set.
    pub fn require_target(&self) -> Result<&str, NotifyError> {
        self.target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                NotifyError::configuration(format!(
                    "receiver '{}' has no target chat or channel id",
                    self.name
                ))
            })
    }

    /// The signing secret, if one is configured and non-blank.
    #[must_use]
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
