//! Plain-text message bodies sent to Telegram.

use crate::{Metric, SystemInfo, config::TelegramConfig};

use super::{FilterListType, FilterUpdate};

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Line oriented message assembly. Lines are joined with `\n`.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    lines: Vec<String>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the message with the trimmed custom prefix, if there is one.
    pub fn prefix(mut self, custom_message: &str) -> Self {
        let prefix = custom_message.trim();
        if !prefix.is_empty() {
            self.lines.push(prefix.to_string());
        }
        self
    }

    pub fn line(mut self, line: impl ToString) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn line_if(self, condition: bool, line: impl FnOnce() -> String) -> Self {
        if condition { self.line(line()) } else { self }
    }

    pub fn blank(self) -> Self {
        self.line("")
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = String>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn compose_alert_message(
    config: &TelegramConfig,
    metric: Metric,
    value: f64,
    threshold: f64,
    info: &SystemInfo,
) -> String {
    MessageBuilder::new()
        .prefix(&config.custom_message)
        .line(format!("🚨 Alert: {} exceeded threshold", metric.display_name()))
        .blank()
        .line("📈 Metrics")
        .line(format!("📍 Metric: {}", metric.display_name()))
        .line(format!("🔥 Current: {}", format_percentage(value)))
        .line(format!("🎯 Threshold: {}", format_percentage(threshold)))
        .blank()
        .lines(system_overview_lines(info))
        .build()
}

pub fn compose_filter_update_message(
    config: &TelegramConfig,
    update: &FilterUpdate,
    info: &SystemInfo,
) -> String {
    let status = if update.enabled { "Enabled" } else { "Disabled" };

    MessageBuilder::new()
        .prefix(&config.custom_message)
        .line(filter_update_header(update.list_type))
        .line(format!("📛 List: {}", fallback(&update.name)))
        .line_if(update.id != 0, || format!("🆔 ID: #{}", format_uint(update.id)))
        .line(format!("🗂️ Type: {}", filter_type_label(update.list_type)))
        .line_if(!update.url.is_empty(), || format!("🔗 Source: {}", update.url))
        .line(format!(
            "📊 Rules: {} entries",
            format_int(update.rules_count.max(0))
        ))
        .line_if(update.bytes_written > 0, || {
            format!("📦 Size: {}", format_bytes(update.bytes_written.unsigned_abs()))
        })
        .line(format!("⚙️ Status: {status}"))
        .blank()
        .lines(system_overview_lines(info))
        .build()
}

fn filter_update_header(list_type: FilterListType) -> &'static str {
    match list_type {
        FilterListType::Allowlist => "✅ Allowlist Update",
        FilterListType::Blocklist => "🚫 Blocklist Update",
        FilterListType::Unknown => "🔄 Filter Update",
    }
}

fn filter_type_label(list_type: FilterListType) -> &'static str {
    match list_type {
        FilterListType::Allowlist => "Allowlist",
        FilterListType::Blocklist => "Blocklist",
        FilterListType::Unknown => "Filter",
    }
}

fn system_overview_lines(info: &SystemInfo) -> Vec<String> {
    let uptime = match format_uptime(info.uptime_seconds) {
        uptime if uptime.is_empty() => "-".to_string(),
        uptime => uptime,
    };

    vec![
        "🖥️ System Overview".to_string(),
        format!("🏷️ Hostname: {}", fallback(&info.hostname)),
        format!("💻 OS: {}", format_os(info)),
        format!("🧠 CPU: {}", format_cpu(info)),
        format!("🔥 CPU Usage: {}", format_percentage(info.cpu_usage)),
        format!(
            "🗃️ Memory Usage: {}",
            format_usage(info.memory_used, info.memory_total, info.memory_usage)
        ),
        format!(
            "📟 Memory Free: {}",
            format_capacity(info.memory_free, info.memory_total)
        ),
        format!(
            "💽 Disk Usage: {}",
            format_usage(info.disk_used, info.disk_total, info.disk_usage)
        ),
        format!(
            "📂 Disk Free: {}",
            format_capacity(info.disk_free, info.disk_total)
        ),
        format!("📁 Disk Path: {}", fallback(&info.disk_path)),
        format!("🌐 Local IPs: {}", format_local_ips(&info.local_ips)),
        format!("🛰️ Public IP: {}", fallback(&info.public_ip)),
        format!("⏱️ Uptime: {uptime}"),
    ]
}

fn format_os(info: &SystemInfo) -> String {
    let os = [info.os_version.trim(), info.os.trim()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or("-");

    match info.arch.trim() {
        "" => os.to_string(),
        arch => format!("{os} ({arch})"),
    }
}

fn format_cpu(info: &SystemInfo) -> String {
    let name = match info.cpu_model.trim() {
        "" => "Unknown CPU",
        model => model,
    };

    if info.num_cpu > 0 {
        format!("{name} ({} cores)", format_uint(info.num_cpu as u64))
    } else {
        name.to_string()
    }
}

fn format_local_ips(ips: &[String]) -> String {
    if ips.is_empty() {
        return "-".to_string();
    }
    ips.join(", ")
}

fn fallback(value: &str) -> &str {
    match value.trim() {
        "" => "-",
        trimmed => trimmed,
    }
}

/// `used / total (pct)` with both sizes in the unit chosen for `total`.
pub fn format_usage(used: u64, total: u64, usage: f64) -> String {
    if total == 0 {
        return "-".to_string();
    }

    let unit = choose_unit(total);
    format!(
        "{} / {} ({})",
        format_bytes_with_unit(used, unit),
        format_bytes_with_unit(total, unit),
        format_percentage(usage)
    )
}

pub fn format_capacity(current: u64, total: u64) -> String {
    if total == 0 {
        return "-".to_string();
    }

    let unit = choose_unit(total);
    format!(
        "{} / {}",
        format_bytes_with_unit(current, unit),
        format_bytes_with_unit(total, unit)
    )
}

pub fn format_bytes(value: u64) -> String {
    format_bytes_with_unit(value, choose_unit(value))
}

/// Renders `value` in `BYTE_UNITS[unit]`. Index 0 prints whole bytes with
/// digit grouping, larger units use at most one decimal.
pub fn format_bytes_with_unit(value: u64, unit: usize) -> String {
    let unit = unit.min(BYTE_UNITS.len() - 1);
    if unit == 0 {
        return format!("{} {}", format_uint(value), BYTE_UNITS[0]);
    }

    let scaled = value as f64 / 1024f64.powi(unit as i32);
    format!("{} {}", format_float(scaled), BYTE_UNITS[unit])
}

pub fn choose_unit(mut value: u64) -> usize {
    let mut unit = 0;
    while value >= 1024 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    unit
}

/// One decimal, with trailing zeros and a dangling point removed.
pub fn format_float(value: f64) -> String {
    let formatted = format!("{value:.1}");
    let trimmed = formatted.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_percentage(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let value = if value <= 0.0 { 0.0 } else { value };
    format!("{}%", format_float(value))
}

pub fn format_int(value: i64) -> String {
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_uint(value: u64) -> String {
    group_digits(&value.to_string())
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// `Xd Yh Zm`. Days are left out while zero, hours only while both days and
/// hours are zero. Zero seconds renders as an empty string.
pub fn format_uptime(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || !parts.is_empty() {
        parts.push(format!("{hours}h"));
    }
    parts.push(format!("{minutes}m"));

    parts.join(" ")
}
