//! Effective quota derived from the settings.

use serde::{Deserialize, Serialize};
use slm_core::{AppError, AppResult};

use super::settings::QuotaSettings;

/// Bytes per configured megabyte.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// The quota as the accounting core sees it. Read-only to accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Quota in bytes.
    pub max_storage_bytes: u64,
    /// Whether over-quota uploads are refused.
    pub blocking_enabled: bool,
    /// No limit applies.
    pub unlimited: bool,
}

impl From<&QuotaSettings> for QuotaConfig {
    fn from(settings: &QuotaSettings) -> Self {
        Self {
            max_storage_bytes: settings.max_storage_mb.saturating_mul(BYTES_PER_MB),
            blocking_enabled: settings.block_uploads,
            unlimited: settings.unlimited,
        }
    }
}

impl QuotaConfig {
    /// Reject a zero quota unless it is explicitly unlimited.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_storage_bytes == 0 && !self.unlimited {
            return Err(AppError::configuration(
                "Quota is zero bytes; set a positive limit or mark it unlimited",
            ));
        }
        Ok(())
    }
}
