use std::{
    collections::{BTreeMap, HashMap, HashSet},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Metric;

/// Alert bookkeeping for one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertState {
    pub active: bool,
    pub last_alert: Option<DateTime<Utc>>,
}

impl AlertState {
    /// Time passed since the last delivered alert, `None` if there never was
    /// one. A last alert in the future counts as just sent.
    pub fn since_last_alert(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_alert
            .map(|last| (now - last).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Per-metric alert flags and last delivery times.
///
/// Clearing an alert only drops the active flag; the last delivery time
/// survives so a metric oscillating around its threshold still honours the
/// cooldown.
#[derive(Debug, Default)]
pub struct AlertStates {
    active: HashSet<Metric>,
    last_alert: HashMap<Metric, DateTime<Utc>>,
}

impl AlertStates {
    pub fn get(&self, metric: Metric) -> AlertState {
        AlertState {
            active: self.active.contains(&metric),
            last_alert: self.last_alert.get(&metric).copied(),
        }
    }

    pub fn mark_active(&mut self, metric: Metric, at: DateTime<Utc>) {
        self.active.insert(metric);
        self.last_alert.insert(metric, at);
    }

    pub fn clear(&mut self, metric: Metric) {
        self.active.remove(&metric);
    }

    pub fn clear_all(&mut self) {
        self.active.clear();
    }

    pub fn snapshot(&self) -> BTreeMap<Metric, AlertState> {
        Metric::ALL
            .into_iter()
            .map(|metric| (metric, self.get(metric)))
            .collect()
    }
}
