//! Quota settings management.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use slm_core::events::SettingsEvent;
use slm_core::result::AppResult;
use slm_core::traits::{EventSink, OptionStore};
use slm_entity::quota::export::is_newer_version;
use slm_entity::quota::settings::SETTINGS_OPTION;
use slm_entity::quota::{QuotaConfig, QuotaSettings, SettingsExport, SettingsNotice, SettingsPatch};

/// Version written into exports and compared on import.
pub const EXPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings after a write, with any sanitisation notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsOutcome {
    /// The settings as stored.
    pub settings: QuotaSettings,
    /// Corrections and warnings produced on the way.
    pub notices: Vec<SettingsNotice>,
}

/// Reads and writes the persisted [`QuotaSettings`].
///
/// Stored documents are overlaid on the configured defaults, so a partial
/// or older document still yields complete settings.
#[derive(Debug, Clone)]
pub struct SettingsService {
    options: Arc<dyn OptionStore>,
    events: Arc<dyn EventSink>,
    defaults: QuotaSettings,
}

impl SettingsService {
    /// Create a service falling back to `defaults`.
    pub fn new(
        options: Arc<dyn OptionStore>,
        events: Arc<dyn EventSink>,
        defaults: QuotaSettings,
    ) -> Self {
        Self {
            options,
            events,
            defaults,
        }
    }

    /// The configured defaults.
    pub fn defaults(&self) -> &QuotaSettings {
        &self.defaults
    }

    /// Current settings.
    pub async fn get_settings(&self) -> AppResult<QuotaSettings> {
        let Some(stored) = self.options.get(SETTINGS_OPTION).await? else {
            return Ok(self.defaults.clone());
        };
        match serde_json::from_value::<SettingsPatch>(stored.value) {
            Ok(patch) => Ok(self.defaults.merged(&patch).0),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed quota settings");
                Ok(self.defaults.clone())
            }
        }
    }

    /// The quota derived from the current settings.
    pub async fn quota_config(&self) -> AppResult<QuotaConfig> {
        Ok(QuotaConfig::from(&self.get_settings().await?))
    }

    /// Whether settings have been stored.
    pub async fn settings_exist(&self) -> AppResult<bool> {
        Ok(self.options.get(SETTINGS_OPTION).await?.is_some())
    }

    /// Merge `patch` into the current settings and store the result.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> AppResult<SettingsOutcome> {
        let current = self.get_settings().await?;
        let (settings, notices) = current.merged(patch);
        self.store(&settings).await?;
        info!(
            max_storage_mb = settings.max_storage_mb,
            block_uploads = settings.block_uploads,
            notices = notices.len(),
            "Quota settings updated"
        );
        Ok(SettingsOutcome { settings, notices })
    }

    /// Overwrite the stored settings with the defaults.
    pub async fn reset_to_defaults(&self) -> AppResult<QuotaSettings> {
        let settings = self.defaults.clone();
        self.store(&settings).await?;
        info!("Quota settings reset to defaults");
        Ok(settings)
    }

    /// Store the defaults unless settings already exist. Returns whether
    /// anything was written.
    pub async fn set_default_settings(&self) -> AppResult<bool> {
        let value = serde_json::to_value(&self.defaults)?;
        let written = self
            .options
            .compare_and_swap(SETTINGS_OPTION, None, &value)
            .await?;
        if written {
            info!("Default quota settings stored");
            self.events.publish(SettingsEvent::DefaultSettingsSet.into());
        }
        Ok(written)
    }

    /// Remove the stored settings. Returns whether any existed.
    pub async fn delete_settings(&self) -> AppResult<bool> {
        let deleted = self.options.delete(SETTINGS_OPTION).await?;
        if deleted {
            info!("Quota settings deleted");
            self.events.publish(SettingsEvent::SettingsDeleted.into());
        }
        Ok(deleted)
    }

    /// A portable copy of the current settings.
    pub async fn export_settings(&self) -> AppResult<SettingsExport> {
        let settings = self.get_settings().await?;
        Ok(SettingsExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            settings: SettingsPatch::from(&settings),
        })
    }

    /// Replace the settings with an imported document.
    ///
    /// Fields missing from the document take their default. A document from
    /// a newer version is imported with a warning.
    pub async fn import_settings(&self, export: &SettingsExport) -> AppResult<SettingsOutcome> {
        let mut notices = Vec::new();
        if is_newer_version(&export.version, EXPORT_VERSION) {
            notices.push(SettingsNotice::warning(
                "version_mismatch",
                "Import data is from a newer version.",
            ));
        }

        let (settings, sanitised) = self.defaults.merged(&export.settings);
        notices.extend(sanitised);
        self.store(&settings).await?;
        info!(
            version = %export.version,
            max_storage_mb = settings.max_storage_mb,
            "Quota settings imported"
        );
        Ok(SettingsOutcome { settings, notices })
    }

    async fn store(&self, settings: &QuotaSettings) -> AppResult<()> {
        self.options
            .put(SETTINGS_OPTION, &serde_json::to_value(settings)?)
            .await?;
        self.events.publish(
            SettingsEvent::SettingsUpdated {
                max_storage_mb: settings.max_storage_mb,
                block_uploads: settings.block_uploads,
            }
            .into(),
        );
        Ok(())
    }
}
