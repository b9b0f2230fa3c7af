//! Concurrency tests
//!
//! These tests verify that the manager is safe to share:
//! - Concurrent checks deliver a single alert per breach
//! - Configuration updates race cleanly with running checks
//! - Start and stop can be called from many tasks at once

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use hostwatch::{Metric, config::TelegramConfig};
use tokio::sync::watch;
use wiremock::MockServer;

use crate::helpers::*;

#[tokio::test]
async fn test_sequential_checks_from_many_handles() {
    let server = MockServer::start().await;
    mount_telegram_ok(&server).await;

    let manager = Arc::new(create_manager(
        &server,
        enabled_config(),
        StaticSnapshot::with_usage(99.0, 0.0, 0.0),
    ));

    // the first check completes before the others start
    manager.run_check().await;

    let mut tasks = vec![];
    for _ in 0..10 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { manager.run_check().await }));
    }
    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(sent_messages(&server).await.len(), 1);
    assert!(manager.alert_states().await[&Metric::Cpu].active);
}

#[tokio::test]
async fn test_concurrent_config_updates_and_reads() {
    let server = MockServer::start().await;
    mount_telegram_ok(&server).await;

    let manager = Arc::new(create_manager(
        &server,
        enabled_config(),
        StaticSnapshot::with_usage(50.0, 50.0, 50.0),
    ));

    let mut tasks = vec![];
    for i in 0..20 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                manager
                    .update_config(TelegramConfig {
                        cpu_threshold: 60.0 + i as f64,
                        ..enabled_config()
                    })
                    .await;
            } else {
                manager.run_check().await;
                let _ = manager.config().await;
                let _ = manager.alert_states().await;
            }
        }));
    }
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let config = manager.config().await;
    assert!(config.cpu_threshold >= 60.0);
    assert!(sent_messages(&server).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_start_spawns_single_loop() {
    let server = MockServer::start().await;
    mount_telegram_ok(&server).await;

    let config = TelegramConfig {
        check_interval: Duration::from_millis(10),
        ..enabled_config()
    };
    let manager = Arc::new(create_manager(
        &server,
        config,
        StaticSnapshot::with_usage(99.0, 0.0, 0.0),
    ));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks = vec![];
    for _ in 0..8 {
        let manager = manager.clone();
        let shutdown_rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { manager.start(shutdown_rx).await }));
    }
    for result in join_all(tasks).await {
        result.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(80)).await;

    let mut tasks = vec![];
    for _ in 0..8 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { manager.stop().await }));
    }
    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert!(!manager.is_running().await);
    assert_eq!(sent_messages(&server).await.len(), 1);
}
