//! Threshold evaluation for a single metric reading.
//!
//! ```text
//! threshold <= 0 or value <= 0              → Disabled        (drop alert state, no message)
//! value >= threshold:
//!   inactive and cooldown elapsed           → StartsToExceed  (send alert)
//!   otherwise                               → Exceeding       (already alerted / cooling down)
//! value < threshold:
//!   active and value < threshold * 0.9      → BackToOk        (drop alert state, no message)
//!   active                                  → Exceeding       (inside the hysteresis band)
//!   inactive                                → Ok
//! ```

use std::time::Duration;

/// Fraction of the threshold a reading must fall below before an active alert
/// is cleared.
pub const RESET_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvaluation {
    Disabled,
    Ok,
    Exceeding,
    StartsToExceed,
    BackToOk,
}

impl ResourceEvaluation {
    /// `since_last_alert` is `None` when the metric has never been alerted.
    pub fn evaluate(
        value: f64,
        threshold: f64,
        active: bool,
        since_last_alert: Option<Duration>,
        cooldown: Duration,
    ) -> ResourceEvaluation {
        if threshold <= 0.0 || value <= 0.0 {
            return ResourceEvaluation::Disabled;
        }

        if value >= threshold {
            let cooled_down = since_last_alert.is_none_or(|elapsed| elapsed >= cooldown);
            if !active && cooled_down {
                return ResourceEvaluation::StartsToExceed;
            }

            return ResourceEvaluation::Exceeding;
        }

        if !active {
            return ResourceEvaluation::Ok;
        }

        if value < threshold * RESET_FACTOR {
            return ResourceEvaluation::BackToOk;
        }

        ResourceEvaluation::Exceeding
    }

    /// Whether the alert state of the metric has to be removed.
    pub fn clears_state(&self) -> bool {
        matches!(
            self,
            ResourceEvaluation::Disabled | ResourceEvaluation::BackToOk
        )
    }
}
