//! Quota defaults.

use serde::{Deserialize, Serialize};

/// Defaults applied to the persisted quota settings when none exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDefaults {
    /// Maximum media storage in megabytes.
    #[serde(default = "default_max_storage_mb")]
    pub max_storage_mb: u64,
    /// Whether uploads exceeding the quota are refused.
    #[serde(default = "default_true")]
    pub block_uploads: bool,
    /// Whether dashboards should render the usage bar.
    #[serde(default = "default_true")]
    pub show_progress_bar: bool,
    /// Treat the quota as explicitly unlimited.
    #[serde(default)]
    pub unlimited: bool,
}

impl Default for QuotaDefaults {
    fn default() -> Self {
        Self {
            max_storage_mb: default_max_storage_mb(),
            block_uploads: true,
            show_progress_bar: true,
            unlimited: false,
        }
    }
}

fn default_max_storage_mb() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
