//! Quota settings events.

use serde::{Deserialize, Serialize};

/// Events emitted when the persisted quota settings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SettingsEvent {
    /// Settings were written (update, import, or reset).
    SettingsUpdated {
        /// Effective quota in megabytes.
        max_storage_mb: u64,
        /// Whether uploads over quota are refused.
        block_uploads: bool,
    },
    /// Defaults were written because no settings existed.
    DefaultSettingsSet,
    /// Settings were deleted.
    SettingsDeleted,
}

impl SettingsEvent {
    /// Short event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SettingsUpdated { .. } => "settings_updated",
            Self::DefaultSettingsSet => "default_settings_set",
            Self::SettingsDeleted => "settings_deleted",
        }
    }
}
