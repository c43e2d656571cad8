//! Error types for the notification system.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::template::TemplateError;

/// Boxed cause kept behind a [`NotifyError::Transport`] failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of one delivery attempt.
pub type DeliveryOutcome = Result<(), NotifyError>;

/// The one failure shape every handler reports, whatever the channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Unknown channel type or an unusable receiver. Never worth retrying.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request never produced a usable response (connect, DNS, timeout,
    /// unreadable or undecodable body).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        timed_out: bool,
        #[source]
        source: Option<BoxError>,
    },

    /// The platform answered, but said no.
    #[error("{channel} rejected notification: {message}")]
    PlatformRejection {
        channel: &'static str,
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// Template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl NotifyError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn transport(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: false,
            source: Some(source.into()),
        }
    }

    pub(crate) fn empty_body() -> Self {
        Self::Transport {
            message: "empty response body".to_string(),
            timed_out: false,
            source: None,
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::Transport {
            message: "delivery cancelled before the platform answered".to_string(),
            timed_out: true,
            source: None,
        }
    }

    /// Whether the failure was a timeout or a caller-side cancellation.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timed_out: true, .. })
    }

    /// Whether a caller-level retry could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        let timed_out = err.is_timeout();
        let message = if timed_out {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else if err.is_decode() || err.is_body() {
            "failed to read response body".to_string()
        } else {
            "HTTP request failed".to_string()
        };

        // Robot URLs carry access tokens.
        Self::Transport {
            message,
            timed_out,
            source: Some(Box::new(err.without_url())),
        }
    }
}

impl From<RegistryError> for NotifyError {
    fn from(err: RegistryError) -> Self {
        Self::Configuration(err.to_string())
    }
}
