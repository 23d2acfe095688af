//! Upload admission results.

use serde::{Deserialize, Serialize};

use crate::usage::{UsageSnapshot, UsageStatus};

/// Result of asking whether an upload may proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadDecision {
    /// Whether the upload is admitted.
    pub allowed: bool,
    /// Explanation when refused.
    pub message: Option<String>,
    /// Usage at decision time.
    pub stats: UsageSnapshot,
}

/// Upload limits for display next to an upload form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRestrictions {
    /// Whether over-quota uploads are refused.
    pub blocking_enabled: bool,
    /// Quota in bytes.
    pub max_storage_bytes: u64,
    /// Tracked usage.
    pub current_usage_bytes: u64,
    /// Bytes left before the quota.
    pub remaining_bytes: u64,
    /// Usage percentage in `[0, 100]`.
    pub percentage_used: f64,
    /// Threshold classification.
    pub status: UsageStatus,
    /// False only when blocking is on and nothing remains.
    pub can_upload: bool,
}
