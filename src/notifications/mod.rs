pub mod compose;
pub mod manager;
pub mod state;
pub mod telegram;

pub use manager::{DEFAULT_TEST_MESSAGE, NotificationManager};
pub use state::{AlertState, AlertStates};
pub use telegram::{DeliveryError, TelegramClient};

use serde::{Deserialize, Serialize};

/// Kind of filter list a refresh applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterListType {
    Blocklist,
    Allowlist,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Result of refreshing a single filter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterUpdate {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub rules_count: i64,
    pub bytes_written: i64,
    pub enabled: bool,
    pub list_type: FilterListType,
}
