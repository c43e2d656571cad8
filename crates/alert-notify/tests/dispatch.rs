//! End-to-end delivery through the public `Dispatcher` API.

use std::time::Duration;

use alert_notify::{
    Alert, Delivery, Dispatcher, NoticeReceiver, NoticeTemplate, NotifyConfig, NotifyError,
    RoutingMetadata, Severity,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> NotifyConfig {
    let uri = server.uri();
    NotifyConfig {
        timeout_secs: 2,
        dingtalk_webhook_url: format!("{uri}/robot/send?access_token="),
        wework_webhook_url: format!("{uri}/cgi-bin/webhook/send?key="),
        feishu_webhook_url: format!("{uri}/open-apis/bot/v2/hook/"),
        telegram_api_url: uri.clone(),
        discord_api_url: format!("{uri}/api/v9"),
        ..NotifyConfig::default()
    }
}

fn cpu_alert() -> Alert {
    Alert::new(
        "web-01",
        Severity::Critical,
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    )
    .with_field("name", "CPU High")
    .with_field("time", "10:00")
}

fn cpu_template() -> NoticeTemplate {
    NoticeTemplate::new("cpu", "Alert: {name} at {time}")
}

fn dingtalk_receiver() -> NoticeReceiver {
    NoticeReceiver::new("ops-group", 5, "tok123")
}

#[tokio::test]
async fn dingtalk_errcode_zero_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .and(query_param("access_token", "tok123"))
        .and(body_partial_json(json!({
            "msgtype": "markdown",
            "markdown": {"text": "Alert: CPU High at 10:00"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let outcome = dispatcher
        .notify(&dingtalk_receiver(), &cpu_template(), &cpu_alert())
        .await;

    assert!(outcome.is_ok(), "{outcome:?}");
}

#[tokio::test]
async fn dingtalk_errcode_nonzero_is_platform_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 300_001, "errmsg": "token invalid"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let err = dispatcher
        .notify(&dingtalk_receiver(), &cpu_template(), &cpu_alert())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, NotifyError::PlatformRejection { message, .. } if message == "token invalid"),
        "{err:?}"
    );
}

#[tokio::test]
async fn unregistered_channel_type_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let receiver = NoticeReceiver::new("mystery", 99, format!("{}/hook", server.uri()));
    let err = dispatcher
        .notify(&receiver, &cpu_template(), &cpu_alert())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, NotifyError::Configuration(msg) if msg == "unknown channel type 99"),
        "{err:?}"
    );
}

#[tokio::test]
async fn every_robot_rejects_non_2xx_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let hook = format!("{}/hook", server.uri());
    let receivers = [
        NoticeReceiver::new("webhook", 2, hook.clone()),
        NoticeReceiver::new("wework", 4, "key"),
        NoticeReceiver::new("dingtalk", 5, "tok"),
        NoticeReceiver::new("feishu", 6, "hook-id"),
        NoticeReceiver::new("telegram", 7, "1:abc").with_target("42"),
        NoticeReceiver::new("slack", 8, hook),
        NoticeReceiver::new("discord", 9, "bot").with_target("42"),
    ];

    for receiver in &receivers {
        let err = dispatcher
            .notify(receiver, &cpu_template(), &cpu_alert())
            .await
            .unwrap_err();
        assert!(
            matches!(&err, NotifyError::PlatformRejection { status: 500, message, .. } if message.contains("500")),
            "{}: {err:?}",
            receiver.name
        );
    }
}

#[tokio::test]
async fn empty_success_body_is_failure_not_panic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let receivers = [
        NoticeReceiver::new("webhook", 2, format!("{}/hook", server.uri())),
        NoticeReceiver::new("wework", 4, "key"),
        NoticeReceiver::new("dingtalk", 5, "tok"),
        NoticeReceiver::new("feishu", 6, "hook-id"),
        NoticeReceiver::new("telegram", 7, "1:abc").with_target("42"),
        NoticeReceiver::new("slack", 8, server.uri()),
        NoticeReceiver::new("discord", 9, "bot").with_target("42"),
    ];

    for receiver in &receivers {
        let outcome = dispatcher
            .notify(receiver, &cpu_template(), &cpu_alert())
            .await;
        assert!(
            matches!(outcome, Err(NotifyError::Transport { .. })),
            "{}: {outcome:?}",
            receiver.name
        );
    }
}

#[tokio::test]
async fn redirect_is_rejected_with_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/moved"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let err = dispatcher
        .notify(&dingtalk_receiver(), &cpu_template(), &cpu_alert())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, NotifyError::PlatformRejection { status: 301, message, .. } if message == "HTTP status 301"),
        "{err:?}"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fan_out_isolates_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/webhook/send"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let deliveries = vec![
        Delivery {
            receiver: dingtalk_receiver().with_routing(RoutingMetadata {
                at_mobiles: vec!["13800000000".to_string()],
                ..RoutingMetadata::default()
            }),
            template: Some(cpu_template()),
        },
        Delivery {
            receiver: NoticeReceiver::new("wecom", 4, "key"),
            template: None,
        },
        Delivery {
            receiver: NoticeReceiver::new("blank", 5, " "),
            template: None,
        },
    ];

    let results = dispatcher.notify_all(&deliveries, &cpu_alert()).await;

    assert!(results[0].1.is_ok(), "{:?}", results[0]);
    assert!(matches!(
        results[1].1,
        Err(NotifyError::PlatformRejection { status: 503, .. })
    ));
    assert!(matches!(results[2].1, Err(NotifyError::Configuration(_))));
}

#[tokio::test]
async fn slow_platform_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = NotifyConfig {
        timeout_secs: 1,
        ..config_for(&server)
    };
    let dispatcher = Dispatcher::from_config(&config).unwrap();
    let err = dispatcher
        .notify(&dingtalk_receiver(), &cpu_template(), &cpu_alert())
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn caller_cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::from_config(&config_for(&server)).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = dispatcher
        .notify_until(&dingtalk_receiver(), &cpu_template(), &cpu_alert(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
}
