//! Persisted quota settings and their sanitisation.

use serde::{Deserialize, Serialize};
use slm_core::config::QuotaDefaults;

/// Option name the settings are stored under.
pub const SETTINGS_OPTION: &str = "slm_settings";

/// Smallest accepted quota in megabytes.
pub const MIN_STORAGE_MB: u64 = 1;

/// Quotas above this many megabytes (about 1 TB) are accepted with a warning.
pub const LARGE_STORAGE_MB: u64 = 1_000_000;

/// Administrator-facing quota settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSettings {
    /// Quota in megabytes (1 MB = 1024 * 1024 bytes).
    pub max_storage_mb: u64,
    /// Whether dashboards render the usage bar.
    pub show_progress_bar: bool,
    /// Whether over-quota uploads are refused.
    pub block_uploads: bool,
    /// Explicitly unlimited quota.
    #[serde(default)]
    pub unlimited: bool,
}

impl From<&QuotaDefaults> for QuotaSettings {
    fn from(defaults: &QuotaDefaults) -> Self {
        Self {
            max_storage_mb: defaults.max_storage_mb,
            show_progress_bar: defaults.show_progress_bar,
            block_uploads: defaults.block_uploads,
            unlimited: defaults.unlimited,
        }
    }
}

impl QuotaSettings {
    /// Apply `patch` on top of `self` and sanitise the result.
    ///
    /// A negative quota is taken by magnitude; anything below
    /// [`MIN_STORAGE_MB`] is raised to it.
    pub fn merged(&self, patch: &SettingsPatch) -> (Self, Vec<SettingsNotice>) {
        let mut notices = Vec::new();

        let mut max_storage_mb = patch
            .max_storage_mb
            .map(i64::unsigned_abs)
            .unwrap_or(self.max_storage_mb);
        if max_storage_mb < MIN_STORAGE_MB {
            max_storage_mb = MIN_STORAGE_MB;
            notices.push(SettingsNotice::error(
                "max_storage_mb_min",
                "Maximum storage must be at least 1 MB.",
            ));
        }
        if max_storage_mb > LARGE_STORAGE_MB {
            notices.push(SettingsNotice::warning(
                "max_storage_mb_large",
                "Very large storage limit detected. Please ensure this is intentional.",
            ));
        }

        let settings = Self {
            max_storage_mb,
            show_progress_bar: patch.show_progress_bar.unwrap_or(self.show_progress_bar),
            block_uploads: patch.block_uploads.unwrap_or(self.block_uploads),
            unlimited: patch.unlimited.unwrap_or(self.unlimited),
        };
        (settings, notices)
    }
}

/// Partial update of [`QuotaSettings`]. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New quota in megabytes. Signed so that bad input can be sanitised
    /// rather than rejected at parse time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_storage_mb: Option<i64>,
    /// New progress bar flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_progress_bar: Option<bool>,
    /// New blocking flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_uploads: Option<bool>,
    /// New unlimited flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

impl From<&QuotaSettings> for SettingsPatch {
    fn from(settings: &QuotaSettings) -> Self {
        Self {
            max_storage_mb: Some(i64::try_from(settings.max_storage_mb).unwrap_or(i64::MAX)),
            show_progress_bar: Some(settings.show_progress_bar),
            block_uploads: Some(settings.block_uploads),
            unlimited: Some(settings.unlimited),
        }
    }
}

/// Severity of a [`SettingsNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The input was corrected.
    Error,
    /// The input was accepted but looks suspicious.
    Warning,
}

/// A message produced while sanitising settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsNotice {
    /// Severity.
    pub level: NoticeLevel,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable text.
    pub message: String,
}

impl SettingsNotice {
    /// An error-level notice.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// A warning-level notice.
    pub fn warning(code: &str, message: &str) -> Self {
        Self {
            level: NoticeLevel::Warning,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
