//! Shared pieces of response classification.
//!
//! Each handler owns its own success rule; these helpers cover the steps
//! they all take: reject non-2xx statuses, insist on a body where the
//! platform promises one, and decode it.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::NotifyError;
use crate::receiver::ChannelType;
use crate::transport::WebhookReply;

/// Longest slice of a response body quoted in an error message.
pub const MAX_SNIPPET_LENGTH: usize = 256;

/// Truncate `s` to at most `max_len` bytes on a char boundary.
#[must_use]
pub fn snippet(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

/// Fail with a rejection naming the status when the reply is not 2xx.
///
/// # Errors
///
/// Returns [`NotifyError::PlatformRejection`] for any non-2xx status.
pub fn ensure_success_status(channel: ChannelType, reply: &WebhookReply) -> Result<(), NotifyError> {
    if reply.is_success() {
        return Ok(());
    }

    let message = match reply.body.as_deref() {
        Some(body) => format!(
            "HTTP status {}: {}",
            reply.status,
            snippet(body.trim(), MAX_SNIPPET_LENGTH)
        ),
        None => format!("HTTP status {}", reply.status),
    };

    Err(NotifyError::PlatformRejection {
        channel: channel.name(),
        status: reply.status,
        code: None,
        message,
    })
}

/// Decode a body the platform is required to send.
///
/// # Errors
///
/// Returns [`NotifyError::Transport`] when the body is absent or does not
/// decode as `T`.
pub fn decode_body<T: DeserializeOwned>(reply: &WebhookReply) -> Result<T, NotifyError> {
    let body = reply.body.as_deref().ok_or_else(NotifyError::empty_body)?;
    serde_json::from_str(body).map_err(|e| NotifyError::transport("unparseable response body", e))
}

/// The `{"errcode": .., "errmsg": ..}` envelope used by DingTalk and WeCom.
#[derive(Debug, Default, Deserialize)]
pub struct ErrcodeReply {
    pub errcode: Option<i64>,
    pub errmsg: Option<String>,
}

impl ErrcodeReply {
    /// Map the envelope to an outcome. A missing `errcode` counts as an
    /// error: these robots always send one.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::PlatformRejection`] for any code other than 0.
    pub fn into_outcome(self, channel: ChannelType, status: u16) -> Result<(), NotifyError> {
        match self.errcode {
            Some(0) => Ok(()),
            code => Err(NotifyError::PlatformRejection {
                channel: channel.name(),
                status,
                code,
                message: platform_message(self.errmsg, code),
            }),
        }
    }
}

/// The platform's own text, or a stand-in naming the code.
pub(crate) fn platform_message(message: Option<String>, code: Option<i64>) -> String {
    match (message.filter(|m| !m.trim().is_empty()), code) {
        (Some(message), _) => message,
        (None, Some(code)) => format!("error code {code}"),
        (None, None) => "response carried no error code".to_string(),
    }
}
