//! The persisted usage record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option name the usage record is stored under.
pub const USAGE_OPTION: &str = "slm_usage_data";

/// Running total of media storage in bytes.
///
/// This is the only persisted accounting state; every other usage figure is
/// derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Tracked bytes. Never negative.
    pub total_bytes: u64,
    /// When the total was last written.
    pub last_updated: DateTime<Utc>,
}

impl UsageRecord {
    /// A record holding `total_bytes`, stamped now.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            last_updated: Utc::now(),
        }
    }

    /// The record after applying a signed change, clamped at zero.
    pub fn with_delta(&self, delta: i64) -> Self {
        Self::new(apply_delta(self.total_bytes, delta))
    }
}

/// `total + delta`, saturating at zero and at `u64::MAX`.
pub fn apply_delta(total: u64, delta: i64) -> u64 {
    if delta.is_negative() {
        total.saturating_sub(delta.unsigned_abs())
    } else {
        total.saturating_add(delta.unsigned_abs())
    }
}
