//! Quota checks for prospective uploads.

use std::sync::Arc;

use tracing::info;

use slm_core::events::UsageEvent;
use slm_core::result::AppResult;
use slm_core::traits::EventSink;
use slm_entity::quota::{QuotaConfig, UploadDecision, UploadRestrictions};
use slm_entity::usage::UsageSnapshot;

use crate::format::{DEFAULT_PRECISION, format_bytes};
use crate::settings::SettingsService;
use crate::usage::{UsageStatsService, UsageStore};

/// Decides whether uploads fit within the quota.
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    store: Arc<UsageStore>,
    settings: Arc<SettingsService>,
    stats: Arc<UsageStatsService>,
    events: Arc<dyn EventSink>,
}

impl QuotaGuard {
    /// Create a guard.
    pub fn new(
        store: Arc<UsageStore>,
        settings: Arc<SettingsService>,
        stats: Arc<UsageStatsService>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            settings,
            stats,
            events,
        }
    }

    /// Whether adding `additional` bytes would push usage over the quota.
    ///
    /// Zero bytes never exceed and an unlimited quota never exceeds. A zero
    /// quota that is not marked unlimited is a configuration error.
    pub async fn would_exceed(&self, additional: u64) -> AppResult<bool> {
        if additional == 0 {
            return Ok(false);
        }
        let quota = self.settings.quota_config().await?;
        if quota.unlimited {
            return Ok(false);
        }
        let current = self.store.get_current_usage().await?;
        exceeds(&quota, current, additional)
    }

    /// Admit or refuse an upload of `file_size` bytes.
    pub async fn evaluate_upload(&self, file_size: u64) -> AppResult<UploadDecision> {
        let quota = self.settings.quota_config().await?;
        let stats = self.stats.get_snapshot().await?;
        self.decide(&quota, stats, file_size)
    }

    /// Admit or refuse a multi-file upload. Each file is checked against the
    /// current usage; the first refusal decides.
    pub async fn evaluate_batch(&self, sizes: &[u64]) -> AppResult<UploadDecision> {
        let quota = self.settings.quota_config().await?;
        let stats = self.stats.get_snapshot().await?;
        for &size in sizes {
            let decision = self.decide(&quota, stats.clone(), size)?;
            if !decision.allowed {
                return Ok(decision);
            }
        }
        Ok(UploadDecision {
            allowed: true,
            message: None,
            stats,
        })
    }

    /// Limits to show next to an upload form.
    pub async fn upload_restrictions(&self) -> AppResult<UploadRestrictions> {
        let quota = self.settings.quota_config().await?;
        let stats = self.stats.get_snapshot().await?;
        Ok(UploadRestrictions {
            blocking_enabled: quota.blocking_enabled,
            max_storage_bytes: stats.max_bytes,
            current_usage_bytes: stats.total_bytes,
            remaining_bytes: stats.remaining_bytes,
            percentage_used: stats.percentage_used,
            status: stats.status,
            can_upload: stats.remaining_bytes > 0 || !quota.blocking_enabled || quota.unlimited,
        })
    }

    /// Largest single upload that would be admitted, bounded by
    /// `system_limit` (the transport's own cap) when given.
    pub async fn max_uploadable_size(&self, system_limit: Option<u64>) -> AppResult<u64> {
        let system_limit = system_limit.unwrap_or(u64::MAX);
        let quota = self.settings.quota_config().await?;
        if !quota.blocking_enabled || quota.unlimited {
            return Ok(system_limit);
        }
        let stats = self.stats.get_snapshot().await?;
        Ok(stats.remaining_bytes.min(system_limit))
    }

    fn decide(
        &self,
        quota: &QuotaConfig,
        stats: UsageSnapshot,
        file_size: u64,
    ) -> AppResult<UploadDecision> {
        if !quota.blocking_enabled || quota.unlimited || file_size == 0 {
            return Ok(UploadDecision {
                allowed: true,
                message: None,
                stats,
            });
        }

        if !exceeds(quota, stats.total_bytes, file_size)? {
            return Ok(UploadDecision {
                allowed: true,
                message: None,
                stats,
            });
        }

        info!(
            file_size,
            total_bytes = stats.total_bytes,
            max_bytes = stats.max_bytes,
            "Upload blocked by storage quota"
        );
        self.events.publish(
            UsageEvent::UploadBlocked {
                file_size,
                total_bytes: stats.total_bytes,
                max_bytes: stats.max_bytes,
            }
            .into(),
        );

        let message = format!(
            "Upload failed: this file ({}) would exceed your storage limit of {}. \
             Current usage: {}. Delete some files to free up space.",
            format_bytes(file_size, DEFAULT_PRECISION),
            stats.formatted.max,
            stats.formatted.total,
        );
        Ok(UploadDecision {
            allowed: false,
            message: Some(message),
            stats,
        })
    }
}

fn exceeds(quota: &QuotaConfig, current: u64, additional: u64) -> AppResult<bool> {
    quota.validate()?;
    Ok(current.saturating_add(additional) > quota.max_storage_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use proptest::prelude::*;
    use slm_core::error::ErrorKind;
    use slm_entity::quota::SettingsPatch;

    /// 1 MB quota (1 048 576 bytes) with `used` bytes tracked.
    async fn harness(used: u64, block: bool) -> Harness {
        let h = Harness::new().await;
        h.services
            .settings
            .update_settings(&SettingsPatch {
                max_storage_mb: Some(1),
                block_uploads: Some(block),
                ..Default::default()
            })
            .await
            .unwrap();
        h.services.usage_store.overwrite(used).await.unwrap();
        h
    }

    #[test]
    fn test_exceeds_arithmetic() {
        let quota = QuotaConfig {
            max_storage_bytes: 1_000_000,
            blocking_enabled: true,
            unlimited: false,
        };
        assert!(!exceeds(&quota, 900_000, 50_000).unwrap());
        assert!(exceeds(&quota, 900_000, 150_000).unwrap());
        assert!(!exceeds(&quota, 900_000, 100_000).unwrap());
        assert!(exceeds(&quota, u64::MAX, 1).unwrap());
    }

    #[test]
    fn test_zero_quota_is_configuration_error() {
        let quota = QuotaConfig {
            max_storage_bytes: 0,
            blocking_enabled: true,
            unlimited: false,
        };
        let err = exceeds(&quota, 0, 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    proptest! {
        #[test]
        fn prop_exceeds_only_past_quota(
            current in 0u64..1 << 40,
            additional in 0u64..1 << 40,
            max in 1u64..1 << 41,
        ) {
            let quota = QuotaConfig {
                max_storage_bytes: max,
                blocking_enabled: true,
                unlimited: false,
            };
            prop_assert_eq!(exceeds(&quota, current, additional).unwrap(), current + additional > max);
        }
    }

    #[tokio::test]
    async fn test_would_exceed() {
        let h = harness(1_000_000, true).await;
        let guard = &h.services.guard;
        assert!(!guard.would_exceed(0).await.unwrap());
        assert!(!guard.would_exceed(48_576).await.unwrap());
        assert!(guard.would_exceed(48_577).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_bytes_never_exceed_even_over_quota() {
        let h = harness(5_000_000, true).await;
        assert!(!h.services.guard.would_exceed(0).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlimited_never_exceeds() {
        let h = harness(5_000_000, true).await;
        h.services
            .settings
            .update_settings(&SettingsPatch {
                unlimited: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!h.services.guard.would_exceed(u64::MAX).await.unwrap());
        let decision = h.services.guard.evaluate_upload(10).await.unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_denial_message_and_event() {
        let h = harness(1_000_000, true).await;
        let mut rx = h.bus.subscribe();

        let decision = h.services.guard.evaluate_upload(100_000).await.unwrap();
        assert!(!decision.allowed);
        let message = decision.message.unwrap();
        assert!(message.contains("1024 KB"), "{message}");
        assert!(message.contains(&decision.stats.formatted.total), "{message}");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "upload_blocked");
    }

    #[tokio::test]
    async fn test_blocking_disabled_allows_everything() {
        let h = harness(1_000_000, false).await;
        let decision = h.services.guard.evaluate_upload(10_000_000).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.message.is_none());
        assert_eq!(
            h.services.guard.max_uploadable_size(Some(64)).await.unwrap(),
            64
        );
    }

    #[tokio::test]
    async fn test_batch_first_denial_wins() {
        let h = harness(1_000_000, true).await;
        let guard = &h.services.guard;
        assert!(guard.evaluate_batch(&[10, 20, 30]).await.unwrap().allowed);

        let decision = guard.evaluate_batch(&[10, 60_000, 70_000]).await.unwrap();
        assert!(!decision.allowed);
        assert!(decision.message.unwrap().contains("58.59 KB"));
    }

    #[tokio::test]
    async fn test_restrictions_and_max_uploadable() {
        let h = harness(1_000_000, true).await;
        let restrictions = h.services.guard.upload_restrictions().await.unwrap();
        assert!(restrictions.blocking_enabled);
        assert_eq!(restrictions.remaining_bytes, 48_576);
        assert!(restrictions.can_upload);

        let guard = &h.services.guard;
        assert_eq!(guard.max_uploadable_size(None).await.unwrap(), 48_576);
        assert_eq!(guard.max_uploadable_size(Some(1000)).await.unwrap(), 1000);

        h.services.usage_store.overwrite(2_000_000).await.unwrap();
        let restrictions = guard.upload_restrictions().await.unwrap();
        assert!(!restrictions.can_upload);
        assert_eq!(guard.max_uploadable_size(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let h = harness(10, true).await;
        h.options.set_unavailable(true);
        let err = h.services.guard.would_exceed(1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);
    }
}
