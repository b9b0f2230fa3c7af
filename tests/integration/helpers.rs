//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use hostwatch::{
    SystemInfo,
    config::TelegramConfig,
    monitors::system::SnapshotProvider,
    notifications::{NotificationManager, TelegramClient},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{method, path},
};

pub const BOT_TOKEN: &str = "4242:test-token";
pub const CHAT_ID: &str = "-1001";
pub const SEND_PATH: &str = "/bot4242:test-token/sendMessage";

/// Snapshot provider returning whatever the test put in.
#[derive(Default)]
pub struct StaticSnapshot {
    info: Mutex<SystemInfo>,
    collects: AtomicUsize,
}

impl StaticSnapshot {
    pub fn with_usage(cpu: f64, memory: f64, disk: f64) -> Arc<Self> {
        let snapshot = Self::default();
        snapshot.set_usage(cpu, memory, disk);
        Arc::new(snapshot)
    }

    pub fn set_usage(&self, cpu: f64, memory: f64, disk: f64) {
        let mut info = self.info.lock().unwrap();
        info.cpu_usage = cpu;
        info.memory_usage = memory;
        info.disk_usage = disk;
    }

    pub fn set_info(&self, info: SystemInfo) {
        *self.info.lock().unwrap() = info;
    }

    pub fn collects(&self) -> usize {
        self.collects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotProvider for StaticSnapshot {
    async fn collect(&self) -> SystemInfo {
        self.collects.fetch_add(1, Ordering::SeqCst);
        self.info.lock().unwrap().clone()
    }
}

pub fn enabled_config() -> TelegramConfig {
    TelegramConfig {
        enabled: true,
        bot_token: BOT_TOKEN.to_string(),
        chat_id: CHAT_ID.to_string(),
        ..Default::default()
    }
}

pub fn create_manager(
    server: &MockServer,
    config: TelegramConfig,
    snapshot: Arc<StaticSnapshot>,
) -> NotificationManager {
    NotificationManager::with_client(
        config,
        snapshot,
        TelegramClient::with_api_base(server.uri()),
    )
}

pub async fn mount_telegram_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(server)
        .await;
}

/// Text field of every message the mock Telegram API received, in order.
pub async fn sent_messages(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(message_text)
        .collect()
}

pub fn message_text(request: &Request) -> Option<String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .find(|(key, _)| key == "text")
        .map(|(_, value)| value)
}
