//! Point-in-time usage snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage at or above which usage is reported as a warning.
pub const WARNING_THRESHOLD: f64 = 75.0;
/// Percentage at or above which usage is reported as critical.
pub const CRITICAL_THRESHOLD: f64 = 90.0;

/// Coarse usage level shown on dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    /// Below the warning threshold.
    Normal,
    /// At or above 75 %.
    Warning,
    /// At or above 90 %.
    Critical,
}

impl UsageStatus {
    /// Classify a percentage.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if percentage >= WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable renderings of a snapshot's figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedUsage {
    /// e.g. `"512.5 MB"`.
    pub total: String,
    /// e.g. `"1000 MB"`.
    pub max: String,
    /// e.g. `"487.5 MB"`.
    pub remaining: String,
    /// e.g. `"51.3%"`.
    pub percentage: String,
}

/// Usage against the quota at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Tracked usage.
    pub total_bytes: u64,
    /// Configured quota.
    pub max_bytes: u64,
    /// `max - total`, floored at zero.
    pub remaining_bytes: u64,
    /// Always within `[0, 100]`.
    pub percentage_used: f64,
    /// Threshold classification of `percentage_used`.
    pub status: UsageStatus,
    /// When the usage record was last written, if ever.
    pub last_updated: Option<DateTime<Utc>>,
    /// Display strings.
    pub formatted: FormattedUsage,
}

/// `total / max * 100`, clamped to `[0, 100]`; zero when `max` is zero.
pub fn percentage_used(total_bytes: u64, max_bytes: u64) -> f64 {
    if max_bytes == 0 {
        return 0.0;
    }
    (total_bytes as f64 / max_bytes as f64 * 100.0).clamp(0.0, 100.0)
}
