//! Usage accounting configuration.

use serde::{Deserialize, Serialize};

/// Settings for the usage store and the recalculation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    /// Number of objects fetched per page during a full rescan.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Directory that relative attachment paths are resolved against.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    /// Optimistic update attempts before a usage mutation gives up.
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            uploads_dir: default_uploads_dir(),
            max_update_retries: default_max_update_retries(),
        }
    }
}

fn default_batch_size() -> u64 {
    100
}

fn default_uploads_dir() -> String {
    "./data/uploads".to_string()
}

fn default_max_update_retries() -> u32 {
    16
}
