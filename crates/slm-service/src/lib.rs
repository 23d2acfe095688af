//! # slm-service
//!
//! The storage usage accounting core. Services are built once by
//! [`AccountingServices::new`] from explicit collaborators and shared as
//! `Arc`s; nothing here is a global.
//!
//! Data flow: object lifecycle notifications apply incremental deltas
//! through the [`UsageStore`] and request a debounced rescan; the
//! [`RecalculationEngine`] periodically replaces the running total with the
//! sum of the files that actually exist; the [`QuotaGuard`] and
//! [`UsageStatsService`] read the total against the configured quota.

pub mod events;
pub mod format;
pub mod lifecycle;
pub mod quota;
pub mod recalc;
pub mod settings;
pub mod usage;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;

use slm_core::config::{AccountingConfig, AppConfig, QuotaDefaults, SchedulerConfig};
use slm_core::result::AppResult;
use slm_core::traits::{CacheProvider, DeferredExecutor, EventSink, ObjectStore, OptionStore};
use slm_entity::quota::QuotaSettings;
use slm_entity::usage::RecalculationReport;

pub use events::EventBus;
pub use lifecycle::LifecycleTracker;
pub use quota::QuotaGuard;
pub use recalc::{RecalculationEngine, RecalculationScheduler};
pub use settings::{SettingsOutcome, SettingsService};
pub use usage::{UsageStatsService, UsageStore};

/// External collaborators the accounting core is written against.
#[derive(Debug, Clone)]
pub struct AccountingDeps {
    /// Versioned persistent key-value options.
    pub options: Arc<dyn OptionStore>,
    /// Stored objects and their backing files.
    pub objects: Arc<dyn ObjectStore>,
    /// TTL flags for the recalculation lease.
    pub cache: Arc<dyn CacheProvider>,
    /// Durable one-shot scheduling.
    pub deferred: Arc<dyn DeferredExecutor>,
    /// Receiver of domain events.
    pub events: Arc<dyn EventSink>,
}

/// The configuration sections the accounting core reads.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub quota: QuotaDefaults,
    pub accounting: AccountingConfig,
    pub scheduler: SchedulerConfig,
}

impl From<&AppConfig> for ServiceOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            quota: config.quota.clone(),
            accounting: config.accounting.clone(),
            scheduler: config.scheduler.clone(),
        }
    }
}

/// Every accounting service, wired together.
#[derive(Debug, Clone)]
pub struct AccountingServices {
    pub settings: Arc<SettingsService>,
    pub usage_store: Arc<UsageStore>,
    pub engine: Arc<RecalculationEngine>,
    pub scheduler: Arc<RecalculationScheduler>,
    pub guard: Arc<QuotaGuard>,
    pub stats: Arc<UsageStatsService>,
    pub lifecycle: Arc<LifecycleTracker>,
}

impl AccountingServices {
    /// Build all services over `deps`.
    pub fn new(deps: AccountingDeps, options: ServiceOptions) -> Self {
        let settings = Arc::new(SettingsService::new(
            Arc::clone(&deps.options),
            Arc::clone(&deps.events),
            QuotaSettings::from(&options.quota),
        ));
        let usage_store = Arc::new(UsageStore::new(
            Arc::clone(&deps.options),
            Arc::clone(&deps.events),
            options.accounting.max_update_retries,
        ));
        let engine = Arc::new(RecalculationEngine::new(
            Arc::clone(&deps.objects),
            Arc::clone(&usage_store),
            Arc::clone(&deps.events),
            options.accounting.batch_size,
        ));
        let scheduler = Arc::new(RecalculationScheduler::new(
            Arc::clone(&deps.cache),
            Arc::clone(&deps.deferred),
            Arc::clone(&engine),
            options.scheduler,
        ));
        let stats = Arc::new(UsageStatsService::new(
            Arc::clone(&usage_store),
            Arc::clone(&settings),
            Arc::clone(&deps.objects),
        ));
        let guard = Arc::new(QuotaGuard::new(
            Arc::clone(&usage_store),
            Arc::clone(&settings),
            Arc::clone(&stats),
            Arc::clone(&deps.events),
        ));
        let lifecycle = Arc::new(LifecycleTracker::new(
            deps.objects,
            Arc::clone(&usage_store),
            Arc::clone(&scheduler),
            deps.events,
        ));

        Self {
            settings,
            usage_store,
            engine,
            scheduler,
            guard,
            stats,
            lifecycle,
        }
    }

    /// First-run setup: store default settings if none exist, then compute
    /// the initial total.
    pub async fn activate(&self) -> AppResult<RecalculationReport> {
        let created = self.settings.set_default_settings().await?;
        let report = self.scheduler.force_recalculate().await?;
        info!(
            defaults_written = created,
            total_bytes = report.total_bytes,
            "Storage accounting activated"
        );
        Ok(report)
    }

    /// Remove everything the accounting core persisted.
    pub async fn uninstall(&self) -> AppResult<()> {
        self.settings.delete_settings().await?;
        self.usage_store.clear().await?;
        self.scheduler.reset().await?;
        info!("Storage accounting data removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;
    use slm_core::traits::OptionStore;
    use slm_entity::quota::settings::SETTINGS_OPTION;
    use slm_entity::quota::SettingsPatch;
    use slm_entity::usage::record::USAGE_OPTION;

    #[tokio::test]
    async fn test_activate_writes_defaults_and_counts() {
        let h = Harness::new().await;
        h.objects.insert("a", None, Some("/a"), Some(700)).await;
        h.objects.insert("b", None, Some("/b"), Some(300)).await;

        let report = h.services.activate().await.unwrap();
        assert_eq!(report.total_bytes, 1000);
        assert!(h.services.settings.settings_exist().await.unwrap());
        assert_eq!(h.services.usage_store.get_current_usage().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_activate_keeps_existing_settings() {
        let h = Harness::new().await;
        h.services
            .settings
            .update_settings(&SettingsPatch {
                max_storage_mb: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();

        h.services.activate().await.unwrap();
        let settings = h.services.settings.get_settings().await.unwrap();
        assert_eq!(settings.max_storage_mb, 5);
    }

    #[tokio::test]
    async fn test_uninstall_removes_persisted_state() {
        let h = Harness::new().await;
        h.objects.insert("a", None, Some("/a"), Some(10)).await;
        h.services.activate().await.unwrap();
        h.services.scheduler.schedule().await.unwrap();

        h.services.uninstall().await.unwrap();
        assert!(h.options.get(SETTINGS_OPTION).await.unwrap().is_none());
        assert!(h.options.get(USAGE_OPTION).await.unwrap().is_none());
        assert!(!h.services.scheduler.is_pending().await.unwrap());
    }
}
