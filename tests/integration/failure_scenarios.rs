//! Failure tests for alert delivery
//!
//! These tests verify that the manager handles failures gracefully:
//! - Telegram unreachable or answering with errors
//! - Alerts stay inactive after failed deliveries and are retried
//! - Filter update failures never surface to the caller

use std::time::Duration;

use assert_matches::assert_matches;
use hostwatch::{
    Metric,
    config::TelegramConfig,
    notifications::{DeliveryError, FilterUpdate, NotificationManager, TelegramClient},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::helpers::*;

#[tokio::test]
async fn test_unreachable_telegram_keeps_alert_inactive() {
    // nothing listens on port 9 of localhost
    let manager = NotificationManager::with_client(
        enabled_config(),
        StaticSnapshot::with_usage(99.0, 0.0, 0.0),
        TelegramClient::with_api_base("http://127.0.0.1:9"),
    );

    manager.run_check().await;

    let cpu = manager.alert_states().await[&Metric::Cpu];
    assert!(!cpu.active);
    assert_eq!(cpu.last_alert, None);
}

#[tokio::test]
async fn test_rejected_alert_is_retried_on_next_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Too Many Requests: retry after 5"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_telegram_ok(&server).await;

    let manager = create_manager(&server, enabled_config(), StaticSnapshot::with_usage(99.0, 0.0, 0.0));

    manager.run_check().await;
    assert!(!manager.alert_states().await[&Metric::Cpu].active);

    manager.run_check().await;
    assert!(manager.alert_states().await[&Metric::Cpu].active);
    assert_eq!(sent_messages(&server).await.len(), 2);
}

#[tokio::test]
async fn test_send_test_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden: bot was blocked"))
        .mount(&server)
        .await;

    let manager = create_manager(&server, enabled_config(), StaticSnapshot::with_usage(0.0, 0.0, 0.0));
    let err = manager.send_test("ping").await.unwrap_err();

    assert_matches!(err, DeliveryError::Status { status: 403, .. });
    assert_eq!(
        err.to_string(),
        "telegram api status 403: Forbidden: bot was blocked"
    );
}

#[tokio::test]
async fn test_filter_update_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let manager = create_manager(&server, enabled_config(), StaticSnapshot::with_usage(0.0, 0.0, 0.0));

    manager.notify_filter_update(FilterUpdate::default()).await;
}

#[tokio::test]
async fn test_slow_telegram_does_not_block_config_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let manager = std::sync::Arc::new(create_manager(
        &server,
        enabled_config(),
        StaticSnapshot::with_usage(99.0, 0.0, 0.0),
    ));

    let check = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run_check().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let update = tokio::time::timeout(
        Duration::from_millis(100),
        manager.update_config(TelegramConfig {
            cpu_threshold: 80.0,
            ..enabled_config()
        }),
    )
    .await;
    assert!(update.is_ok(), "config update waited for the outbound request");

    check.await.unwrap();
    assert!(manager.alert_states().await[&Metric::Cpu].active);
}

#[tokio::test]
async fn test_disabling_during_delivery_leaves_no_active_alert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let manager = std::sync::Arc::new(create_manager(
        &server,
        enabled_config(),
        StaticSnapshot::with_usage(99.0, 0.0, 0.0),
    ));

    let check = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run_check().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    manager.update_config(TelegramConfig::default()).await;
    check.await.unwrap();

    let states = manager.alert_states().await;
    assert!(states.values().all(|state| !state.active));

    // the next tick still sees 99% CPU but stays silent
    manager.run_check().await;
    assert_eq!(sent_messages(&server).await.len(), 1);
}
