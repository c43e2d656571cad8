//! Channel type code → handler mapping.
//!
//! Built once at startup, then shared read-only (`Arc<HandlerRegistry>`).

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::channels::{
    ChannelHandler, DingTalkHandler, DiscordHandler, FeishuHandler, SlackHandler,
    TelegramHandler, WeWorkHandler, WebhookHandler,
};
use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::transport::WebhookClient;

/// Registration and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler already owns this code.
    #[error("channel type {0} is already registered")]
    DuplicateType(u8),

    /// No handler owns this code.
    #[error("unknown channel type {0}")]
    UnknownChannelType(u8),
}

/// Exactly one handler per channel type code.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<u8, Arc<dyn ChannelHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in handler, sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the HTTP client cannot be built.
    pub fn with_builtin_handlers(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = WebhookClient::new(config)?;
        let handlers: Vec<Arc<dyn ChannelHandler>> = vec![
            Arc::new(WebhookHandler::new(config, client.clone())),
            Arc::new(WeWorkHandler::new(config, client.clone())),
            Arc::new(DingTalkHandler::new(config, client.clone())),
            Arc::new(FeishuHandler::new(config, client.clone())),
            Arc::new(TelegramHandler::new(config, client.clone())),
            Arc::new(SlackHandler::new(config, client.clone())),
            Arc::new(DiscordHandler::new(config, client)),
        ];

        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler)?;
        }

        info!(
            handler_count = registry.len(),
            "Notification handlers registered"
        );

        Ok(registry)
    }

    /// Add `handler` under its channel type code.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateType`] if the code is taken.
    pub fn register(&mut self, handler: Arc<dyn ChannelHandler>) -> Result<(), RegistryError> {
        let code = handler.channel_type().code();
        if self.handlers.contains_key(&code) {
            return Err(RegistryError::DuplicateType(code));
        }
        self.handlers.insert(code, handler);
        Ok(())
    }

    /// Handler registered for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownChannelType`] if nothing is registered.
    pub fn resolve(&self, code: u8) -> Result<&Arc<dyn ChannelHandler>, RegistryError> {
        self.handlers
            .get(&code)
            .ok_or(RegistryError::UnknownChannelType(code))
    }

    #[must_use]
    pub fn contains(&self, code: u8) -> bool {
        self.handlers.contains_key(&code)
    }

    /// Registered codes in ascending order.
    #[must_use]
    pub fn codes(&self) -> Vec<u8> {
        self.handlers.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}
