//! Delivery rate for sample streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a sample stream yields rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every row the source produces (the header tick rate, usually 60Hz)
    #[default]
    Native,

    /// At most this many rows per second, keeping the latest row of each
    /// interval. Rates at or above the source rate collapse to `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Resolve against the source tick rate.
    pub fn normalize(self, tick_rate: i32) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if tick_rate > 0 && i64::from(hz) >= i64::from(tick_rate) => {
                UpdateRate::Native
            }
            other => other,
        }
    }

    /// Interval between yielded rows, or `None` when no throttling applies.
    pub fn throttle_interval(self, tick_rate: i32) -> Option<Duration> {
        match self.normalize(tick_rate) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
