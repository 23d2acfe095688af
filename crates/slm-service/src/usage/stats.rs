//! Usage snapshots for dashboards and admission decisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use slm_core::result::AppResult;
use slm_core::traits::ObjectStore;
use slm_entity::usage::snapshot::percentage_used;
use slm_entity::usage::{FileStatistics, FormattedUsage, UsageSnapshot, UsageStatus};

use crate::format::{DEFAULT_PRECISION, format_bytes, format_percentage};
use crate::settings::SettingsService;

use super::store::UsageStore;

/// Derives [`UsageSnapshot`]s from the usage record and the quota.
#[derive(Debug, Clone)]
pub struct UsageStatsService {
    store: Arc<UsageStore>,
    settings: Arc<SettingsService>,
    objects: Arc<dyn ObjectStore>,
}

impl UsageStatsService {
    /// Create a service.
    pub fn new(
        store: Arc<UsageStore>,
        settings: Arc<SettingsService>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            store,
            settings,
            objects,
        }
    }

    /// Usage against the quota right now.
    ///
    /// An unlimited quota is reported with `max_bytes = 0`, which reads as
    /// 0 % and normal.
    pub async fn get_snapshot(&self) -> AppResult<UsageSnapshot> {
        let (record, quota) =
            tokio::try_join!(self.store.get_record(), self.settings.quota_config())?;
        let total = record.map_or(0, |r| r.total_bytes);
        let last_updated = record.map(|r| r.last_updated);
        let max_bytes = if quota.unlimited {
            0
        } else {
            quota.max_storage_bytes
        };
        Ok(build_snapshot(total, max_bytes, last_updated))
    }

    /// Threshold classification of the current usage.
    pub async fn status(&self) -> AppResult<UsageStatus> {
        Ok(self.get_snapshot().await?.status)
    }

    /// Object counts grouped by top-level MIME type.
    pub async fn file_statistics(&self) -> AppResult<FileStatistics> {
        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        for (mime, count) in self.objects.type_counts().await? {
            let top_level = mime.split('/').next().unwrap_or_default().trim();
            let top_level = if top_level.is_empty() {
                "unknown"
            } else {
                top_level
            };
            *by_type.entry(top_level.to_ascii_lowercase()).or_default() += count;
        }

        Ok(FileStatistics {
            total_files: by_type.values().sum(),
            by_type: by_type.into_iter().collect(),
        })
    }
}

/// Assemble a snapshot from raw figures.
pub fn build_snapshot(
    total_bytes: u64,
    max_bytes: u64,
    last_updated: Option<DateTime<Utc>>,
) -> UsageSnapshot {
    let remaining_bytes = max_bytes.saturating_sub(total_bytes);
    let percentage = percentage_used(total_bytes, max_bytes);

    UsageSnapshot {
        total_bytes,
        max_bytes,
        remaining_bytes,
        percentage_used: percentage,
        status: UsageStatus::from_percentage(percentage),
        last_updated,
        formatted: FormattedUsage {
            total: format_bytes(total_bytes, DEFAULT_PRECISION),
            max: format_bytes(max_bytes, DEFAULT_PRECISION),
            remaining: format_bytes(remaining_bytes, DEFAULT_PRECISION),
            percentage: format_percentage(percentage),
        },
    }
}
