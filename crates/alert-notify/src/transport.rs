//! Request values and the single HTTP call each delivery makes.
//!
//! Handlers build a [`WebhookRequest`] without touching the network; the
//! [`WebhookClient`] executes it and hands back a [`WebhookReply`] for the
//! handler to classify.

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// A fully built POST, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

impl WebhookRequest {
    /// Build a JSON POST to `url`.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Configuration`] if `url` does not parse (the URL is left
    /// out of the message since it usually embeds a token) or if `payload`
    /// cannot be encoded as JSON.
    pub fn post_json(url: &str, payload: &impl Serialize) -> Result<Self, NotifyError> {
        let url = Url::parse(url)
            .map_err(|e| NotifyError::configuration(format!("invalid webhook url: {e}")))?;
        let body = serde_json::to_value(payload)
            .map_err(|e| NotifyError::configuration(format!("failed to encode request body: {e}")))?;

        Ok(Self {
            url,
            headers: Vec::new(),
            body,
        })
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Value of a header added with [`Self::with_header`].
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the platform sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    /// `None` when the body was empty or whitespace only.
    pub body: Option<String>,
}

impl WebhookReply {
    #[must_use]
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self {
            status,
            body: body.filter(|b| !b.trim().is_empty()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Thin wrapper over a shared `reqwest::Client` with bounded timeouts.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    /// Build a client using the configured timeouts.
    ///
    /// Redirects are not followed: a 3xx is handed back as the reply.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NotifyError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with the host application.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Perform exactly one POST. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] for connection failures, timeouts
    /// and unreadable bodies. HTTP error statuses are returned as a reply,
    /// not an error.
    pub async fn execute(&self, request: &WebhookRequest) -> Result<WebhookReply, NotifyError> {
        let mut builder = self
            .client
            .post(request.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder.json(&request.body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, body_len = body.len(), "Webhook responded");

        Ok(WebhookReply::new(status, Some(body)))
    }
}
