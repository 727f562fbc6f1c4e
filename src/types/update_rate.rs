//! Delivery rate for latest-value record subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a latest-value subscription yields records.
///
/// Device output rates go up to 400 Hz or more; dashboards usually want far less.
/// Throttled subscriptions drop intermediate records ("latest wins"); use
/// `XbusConnection::records` when every record matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRate {
    /// Every record as it is decoded.
    #[default]
    Native,

    /// At most this many records per second.
    Max(u32),
}

impl UpdateRate {
    /// Collapse to `Native` when the cap is at or above the device output rate, or zero.
    pub fn normalize(self, nominal_hz: f64) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if f64::from(hz) >= nominal_hz => UpdateRate::Native,
            other => other,
        }
    }

    /// Interval between emitted records, if throttling applies.
    pub fn throttle_interval(self, nominal_hz: f64) -> Option<Duration> {
        match self.normalize(nominal_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
