//! Message templates and the renderer shared by every handler.
//!
//! Placeholders are written `{name}` where `name` is an identifier
//! (`[A-Za-z_][A-Za-z0-9_.]*`). Values come from [`Alert::lookup`].
//!
//! - `{{` renders a literal `{`.
//! - A `{` that does not start an identifier is copied as-is, so JSON
//!   bodies can be used as templates without escaping.
//! - Placeholders the alert cannot resolve are left verbatim.
//! - A placeholder that is opened but never closed is a [`TemplateError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::Alert;
use crate::receiver::ChannelType;

const MARKDOWN_TEMPLATE: &str = "**[{severity}] {target}**\n\n{content}\n\nFired at: {fired_at}";
const SLACK_TEMPLATE: &str = "*[{severity}] {target}*\n{content}\nFired at: {fired_at}";
const PLAIN_TEMPLATE: &str = "[{severity}] {target}\n{content}\nFired at: {fired_at}";

/// A malformed template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template error: unterminated placeholder at byte {offset} in template '{template}'")]
pub struct TemplateError {
    /// Name of the offending template.
    pub template: String,
    /// Byte offset of the opening `{`.
    pub offset: usize,
}

/// A named, versioned message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeTemplate {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub content: String,
}

const fn default_version() -> u32 {
    1
}

impl NoticeTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            version: default_version(),
            content: content.into(),
        }
    }

    /// Default template for a channel, used when a receiver has none.
    #[must_use]
    pub fn builtin(channel: ChannelType) -> Self {
        let content = match channel {
            ChannelType::DingTalkRobot | ChannelType::WeWorkRobot | ChannelType::DiscordBot => {
                MARKDOWN_TEMPLATE
            }
            ChannelType::SlackWebhook => SLACK_TEMPLATE,
            ChannelType::Webhook | ChannelType::FeishuRobot | ChannelType::TelegramBot => {
                PLAIN_TEMPLATE
            }
        };
        Self::new(format!("builtin-{}", channel.name()), content)
    }
}

/// Render `template` against `alert`.
///
/// Deterministic and side-effect free.
///
/// # Errors
///
/// Returns [`TemplateError`] when a placeholder is opened but not closed.
pub fn render(template: &NoticeTemplate, alert: &Alert) -> Result<String, TemplateError> {
    let source = template.content.as_str();
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();

    while let Some((open, ch)) = chars.next() {
        if ch != '{' {
            out.push(ch);
            continue;
        }

        match chars.peek() {
            Some(&(_, '{')) => {
                chars.next();
                out.push('{');
            }
            Some(&(_, c)) if is_ident_start(c) => {
                let mut close = None;
                while let Some(&(idx, c)) = chars.peek() {
                    if c == '}' {
                        chars.next();
                        close = Some(idx);
                        break;
                    }
                    if !is_ident_continue(c) {
                        break;
                    }
                    chars.next();
                }

                let Some(close) = close else {
                    return Err(TemplateError {
                        template: template.name.clone(),
                        offset: open,
                    });
                };

                let name = &source[open + 1..close];
                match alert.lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&source[open..=close]),
                }
            }
            _ => out.push('{'),
        }
    }

    Ok(out)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}
