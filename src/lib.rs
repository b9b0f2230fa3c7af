#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod monitors;
pub mod notifications;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the host. A zero or empty field means the value
/// could not be collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub hostname: String,
    pub num_cpu: usize,
    pub cpu_model: String,
    pub cpu_usage: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_usage: f64,
    pub memory_free: u64,
    pub disk_path: String,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_usage: f64,
    pub disk_free: u64,
    pub local_ips: Vec<String>,
    pub public_ip: String,
    pub uptime_seconds: u64,
}

/// Resource tracked by the threshold monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
        }
    }

    /// Human readable name used in alert messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Cpu => "CPU usage",
            Metric::Memory => "Memory usage",
            Metric::Disk => "Disk usage",
        }
    }

    /// Current usage percentage of this metric in the snapshot.
    pub fn value(&self, info: &SystemInfo) -> f64 {
        match self {
            Metric::Cpu => info.cpu_usage,
            Metric::Memory => info.memory_usage,
            Metric::Disk => info.disk_usage,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
