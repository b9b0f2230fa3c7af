use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{config::TelegramConfig, util::read_body_limited};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Longest text (in characters) a single message may carry.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram configuration is incomplete")]
    IncompleteConfig,
    #[error("send request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("telegram api status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode telegram response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("telegram api error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Thin client for the Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
}

impl TelegramClient {
    pub fn new() -> Self {
        Self::with_api_base(TELEGRAM_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Sends `message` to the configured chat. Blank messages are skipped.
    #[instrument(skip_all, fields(chat_id = %config.chat_id))]
    pub async fn send(&self, config: &TelegramConfig, message: &str) -> Result<(), DeliveryError> {
        let text = truncate_message(message.trim());
        if text.is_empty() {
            debug!("skipping empty telegram message");
            return Ok(());
        }

        let endpoint = format!("{}/bot{}/sendMessage", self.api_base, config.bot_token);
        let response = self
            .client
            .post(&endpoint)
            .timeout(REQUEST_TIMEOUT)
            .form(&[("chat_id", config.chat_id.as_str()), ("text", text)])
            .send()
            .await
            // the url carries the bot token
            .map_err(|e| DeliveryError::Request(e.without_url()))?;

        let status = response.status();
        let body = read_body_limited(response, TELEGRAM_MAX_MESSAGE_LEN).await;

        if status != StatusCode::OK {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        if body.is_empty() {
            return Ok(());
        }

        let response: ApiResponse = serde_json::from_slice(&body)?;
        if response.ok {
            return Ok(());
        }

        let description = response
            .description
            .map(|description| description.trim().to_string())
            .filter(|description| !description.is_empty())
            .or_else(|| {
                Some(String::from_utf8_lossy(&body).trim().to_string())
                    .filter(|body| !body.is_empty())
            })
            .unwrap_or_else(|| "unknown telegram error".to_string());

        Err(DeliveryError::Api(description))
    }
}

impl Default for TelegramClient {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_message(message: &str) -> &str {
    match message.char_indices().nth(TELEGRAM_MAX_MESSAGE_LEN) {
        Some((end, _)) => &message[..end],
        None => message,
    }
}
