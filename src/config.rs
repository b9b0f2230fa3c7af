use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::Metric;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const MIN_COOLDOWN: Duration = Duration::from_secs(60);
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_THRESHOLD: f64 = 90.0;

/// Runtime configuration of the Telegram notifications.
///
/// Durations are (de)serialized as milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    #[serde(with = "duration_millis")]
    pub check_interval: Duration,
    #[serde(with = "duration_millis")]
    pub cooldown: Duration,
    pub custom_message: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            cpu_threshold: DEFAULT_THRESHOLD,
            memory_threshold: DEFAULT_THRESHOLD,
            disk_threshold: DEFAULT_THRESHOLD,
            check_interval: DEFAULT_CHECK_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
            custom_message: String::new(),
        }
    }
}

impl TelegramConfig {
    /// Replaces zero durations with their defaults.
    pub fn normalize(mut self) -> Self {
        if self.check_interval.is_zero() {
            self.check_interval = DEFAULT_CHECK_INTERVAL;
        }

        if self.cooldown.is_zero() {
            self.cooldown = DEFAULT_COOLDOWN;
        }

        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Whether scheduled alerts and event notifications may be delivered.
    pub fn is_deliverable(&self) -> bool {
        self.enabled && self.has_credentials()
    }

    pub fn threshold(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.cpu_threshold,
            Metric::Memory => self.memory_threshold,
            Metric::Disk => self.disk_threshold,
        }
    }
}

/// Validation failures for configuration submitted through the control API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("check_interval must be between {min}s and {max}s", min = MIN_CHECK_INTERVAL.as_secs(), max = MAX_CHECK_INTERVAL.as_secs())]
    IntervalOutOfRange,

    #[error("cooldown must be between {min}s and {max}s", min = MIN_COOLDOWN.as_secs(), max = MAX_COOLDOWN.as_secs())]
    CooldownOutOfRange,

    #[error("{0} threshold must be between 0 and 100")]
    ThresholdOutOfRange(Metric),

    #[error("bot_token and chat_id are required when notifications are enabled")]
    MissingCredentials,
}

/// Wire shape of a configuration update. Durations are milliseconds and may be
/// out of range, which [`TelegramConfigPayload::validate`] rejects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfigPayload {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    pub check_interval: i64,
    pub cooldown: i64,
    pub custom_message: String,
}

impl TelegramConfigPayload {
    pub fn validate(self) -> Result<TelegramConfig, ConfigError> {
        let check_interval =
            millis_in_range(self.check_interval, MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL)
                .ok_or(ConfigError::IntervalOutOfRange)?;

        let cooldown = millis_in_range(self.cooldown, MIN_COOLDOWN, MAX_COOLDOWN)
            .ok_or(ConfigError::CooldownOutOfRange)?;

        for (metric, value) in [
            (Metric::Cpu, self.cpu_threshold),
            (Metric::Memory, self.memory_threshold),
            (Metric::Disk, self.disk_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange(metric));
            }
        }

        let config = TelegramConfig {
            enabled: self.enabled,
            bot_token: self.bot_token.trim().to_string(),
            chat_id: self.chat_id.trim().to_string(),
            cpu_threshold: self.cpu_threshold,
            memory_threshold: self.memory_threshold,
            disk_threshold: self.disk_threshold,
            check_interval,
            cooldown,
            custom_message: self.custom_message.trim().to_string(),
        };

        if config.enabled && !config.has_credentials() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(config.normalize())
    }
}

fn millis_in_range(millis: i64, min: Duration, max: Duration) -> Option<Duration> {
    let millis = u64::try_from(millis).ok()?;
    let duration = Duration::from_millis(millis);
    (min..=max).contains(&duration).then_some(duration)
}

/// Control API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "crate::util::get_addr")]
    pub addr: IpAddr,
    #[serde(default = "crate::util::get_port")]
    pub port: u16,
    /// Bearer token required on every request (falls back to `HOSTWATCH_SECRET`)
    pub token: Option<String>,
    #[serde(default)]
    pub cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            addr: crate::util::get_addr(),
            port: crate::util::get_port(),
            token: None,
            cors: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Control API settings (optional - the API is not served without them)
    pub api: Option<ApiSettings>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config: &Config| {
            trace!(
                "loaded config: telegram enabled = {}, api = {}",
                config.telegram.enabled,
                config.api.is_some()
            )
        })
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    // negative values collapse to zero and are normalized later
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or_default()))
    }
}
