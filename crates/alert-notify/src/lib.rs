//! Alert notification dispatch to webhook-based chat robots.
//!
//! A fired [`Alert`] is rendered through a [`NoticeTemplate`] and delivered
//! to a [`NoticeReceiver`] by the [`ChannelHandler`] registered for the
//! receiver's channel type code. Every delivery is one HTTP POST whose reply
//! is classified into a [`DeliveryOutcome`].
//!
//! # Usage
//!
//! ```no_run
//! use alert_notify::{Alert, Dispatcher, NoticeReceiver, NoticeTemplate, NotifyConfig, Severity};
//!
//! # async fn run() -> Result<(), alert_notify::NotifyError> {
//! let dispatcher = Dispatcher::from_config(&NotifyConfig::from_env())?;
//!
//! let receiver = NoticeReceiver::new("ops-group", 5, "dingtalk-access-token");
//! let template = NoticeTemplate::new("cpu", "Alert: {name} at {time}");
//! let alert = Alert::new("web-01", Severity::Critical, chrono::Utc::now())
//!     .with_field("name", "CPU High")
//!     .with_field("time", "10:00");
//!
//! dispatcher.notify(&receiver, &template, &alert).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`ChannelHandler`] is implemented once per platform (DingTalk, WeCom,
//!   Feishu, Telegram, Slack, Discord, generic webhook)
//! - [`HandlerRegistry`] maps channel type codes to handlers
//! - [`Dispatcher`] resolves the handler and passes its outcome through
//!
//! Adding a platform means one new handler and one registration.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod receiver;
pub mod registry;
pub mod template;
pub mod transport;

pub use channels::ChannelHandler;
pub use config::NotifyConfig;
pub use error::{DeliveryOutcome, NotifyError};
pub use events::{Alert, Severity};
pub use receiver::{ChannelType, NoticeReceiver, RoutingMetadata};
pub use registry::{HandlerRegistry, RegistryError};
pub use template::{NoticeTemplate, TemplateError};

use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One target in a fan-out, with its template (or the channel default).
#[derive(Debug, Clone)]
pub struct Delivery {
    pub receiver: NoticeReceiver,
    pub template: Option<NoticeTemplate>,
}

/// Routes each notification to the handler for its channel type.
///
/// Holds only the read-only registry, so it is cheap to clone and safe to
/// call from many tasks at once.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Dispatcher over all built-in handlers.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the HTTP client cannot be built.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        Ok(Self::new(HandlerRegistry::with_builtin_handlers(config)?))
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn resolve(&self, receiver: &NoticeReceiver) -> Result<&Arc<dyn ChannelHandler>, NotifyError> {
        self.registry.resolve(receiver.channel_type).map_err(|e| {
            warn!(receiver = %receiver.name, error = %e, "No handler for receiver");
            NotifyError::from(e)
        })
    }

    /// Deliver `alert` to `receiver` using `template`.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Configuration`] for an unregistered channel type (no
    /// network call is made); otherwise whatever the handler reports.
    pub async fn notify(
        &self,
        receiver: &NoticeReceiver,
        template: &NoticeTemplate,
        alert: &Alert,
    ) -> DeliveryOutcome {
        let handler = self.resolve(receiver)?;
        debug!(
            channel = handler.channel_type().name(),
            receiver = %receiver.name,
            "Dispatching notification"
        );
        handler.send(receiver, template, alert).await
    }

    /// Like [`Self::notify`], with the channel's built-in template.
    ///
    /// # Errors
    ///
    /// Same as [`Self::notify`].
    pub async fn notify_default(&self, receiver: &NoticeReceiver, alert: &Alert) -> DeliveryOutcome {
        let handler = self.resolve(receiver)?;
        let template = NoticeTemplate::builtin(handler.channel_type());
        handler.send(receiver, &template, alert).await
    }

    /// Like [`Self::notify`], abandoning the request once `cancel` fires.
    ///
    /// # Errors
    ///
    /// A cancelled delivery is a [`NotifyError::Transport`] with
    /// `timed_out` set; everything else as for [`Self::notify`].
    pub async fn notify_until(
        &self,
        receiver: &NoticeReceiver,
        template: &NoticeTemplate,
        alert: &Alert,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(receiver = %receiver.name, "Notification cancelled");
                Err(NotifyError::cancelled())
            }
            outcome = self.notify(receiver, template, alert) => outcome,
        }
    }

    /// Deliver one alert to many receivers concurrently.
    ///
    /// Returns one `(receiver name, outcome)` per delivery, in input order.
    /// A failure for one receiver never affects the others.
    pub async fn notify_all(
        &self,
        deliveries: &[Delivery],
        alert: &Alert,
    ) -> Vec<(String, DeliveryOutcome)> {
        let sends = deliveries.iter().map(|delivery| async move {
            let outcome = match &delivery.template {
                Some(template) => self.notify(&delivery.receiver, template, alert).await,
                None => self.notify_default(&delivery.receiver, alert).await,
            };
            (delivery.receiver.name.clone(), outcome)
        });

        join_all(sends).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{WebhookClient, WebhookReply, WebhookRequest};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records what it is asked to send instead of touching the network.
    struct RecordingHandler {
        channel: ChannelType,
        client: WebhookClient,
        calls: Arc<AtomicUsize>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl RecordingHandler {
        fn new(channel: ChannelType, calls: Arc<AtomicUsize>) -> Self {
            Self {
                channel,
                client: WebhookClient::new(&NotifyConfig::default()).unwrap(),
                calls,
                fail: false,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl ChannelHandler for RecordingHandler {
        fn channel_type(&self) -> ChannelType {
            self.channel
        }

        fn client(&self) -> &WebhookClient {
            &self.client
        }

        fn build_request(
            &self,
            _receiver: &NoticeReceiver,
            _content: &str,
            _alert: &Alert,
        ) -> Result<WebhookRequest, NotifyError> {
            WebhookRequest::post_json("http://localhost/", &serde_json::json!({}))
        }

        fn classify(&self, _reply: &WebhookReply) -> DeliveryOutcome {
            Ok(())
        }

        async fn send(
            &self,
            _receiver: &NoticeReceiver,
            template: &NoticeTemplate,
            alert: &Alert,
        ) -> DeliveryOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            template::render(template, alert)?;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(NotifyError::PlatformRejection {
                    channel: self.channel.name(),
                    status: 200,
                    code: Some(1),
                    message: "nope".to_string(),
                });
            }
            Ok(())
        }
    }

    fn alert() -> Alert {
        Alert::new("web-01", Severity::Warning, Utc::now()).with_field("name", "CPU High")
    }

    fn dispatcher_with(handlers: Vec<RecordingHandler>) -> Dispatcher {
        let mut registry = HandlerRegistry::new();
        for handler in handlers {
            registry.register(Arc::new(handler)).unwrap();
        }
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_routes_by_channel_type() {
        let dingtalk_calls = Arc::new(AtomicUsize::new(0));
        let slack_calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![
            RecordingHandler::new(ChannelType::DingTalkRobot, dingtalk_calls.clone()),
            RecordingHandler::new(ChannelType::SlackWebhook, slack_calls.clone()),
        ]);

        let receiver = NoticeReceiver::new("ops", 5, "tok");
        let template = NoticeTemplate::new("t", "{name}");
        dispatcher.notify(&receiver, &template, &alert()).await.unwrap();

        assert_eq!(dingtalk_calls.load(Ordering::SeqCst), 1);
        assert_eq!(slack_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_type_is_configuration_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![RecordingHandler::new(
            ChannelType::DingTalkRobot,
            calls.clone(),
        )]);

        let receiver = NoticeReceiver::new("ops", 99, "tok");
        let err = dispatcher
            .notify(&receiver, &NoticeTemplate::new("t", "x"), &alert())
            .await
            .unwrap_err();

        assert!(matches!(&err, NotifyError::Configuration(msg) if msg == "unknown channel type 99"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_template_error_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            dispatcher_with(vec![RecordingHandler::new(ChannelType::WeWorkRobot, calls)]);

        let err = dispatcher
            .notify(
                &NoticeReceiver::new("ops", 4, "key"),
                &NoticeTemplate::new("broken", "Alert: {name"),
                &alert(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Template(TemplateError { offset: 7, .. })));
    }

    #[tokio::test]
    async fn test_fan_out_outcomes_are_independent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut failing = RecordingHandler::new(ChannelType::FeishuRobot, calls.clone());
        failing.fail = true;
        let dispatcher = dispatcher_with(vec![
            RecordingHandler::new(ChannelType::DingTalkRobot, calls.clone()),
            failing,
        ]);

        let deliveries = vec![
            Delivery {
                receiver: NoticeReceiver::new("dingtalk-ops", 5, "tok"),
                template: None,
            },
            Delivery {
                receiver: NoticeReceiver::new("feishu-ops", 6, "tok"),
                template: Some(NoticeTemplate::new("t", "{name}")),
            },
            Delivery {
                receiver: NoticeReceiver::new("nowhere", 42, "tok"),
                template: None,
            },
        ];

        let results = dispatcher.notify_all(&deliveries, &alert()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "dingtalk-ops");
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(NotifyError::PlatformRejection { .. })));
        assert!(matches!(results[2].1, Err(NotifyError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_as_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut slow = RecordingHandler::new(ChannelType::TelegramBot, calls);
        slow.delay = Some(Duration::from_secs(30));
        let dispatcher = dispatcher_with(vec![slow]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = dispatcher
            .notify_until(
                &NoticeReceiver::new("tg", 7, "tok").with_target("1"),
                &NoticeTemplate::new("t", "x"),
                &alert(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "{err:?}");
    }
}
