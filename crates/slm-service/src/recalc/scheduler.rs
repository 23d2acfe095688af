//! Debounced recalculation scheduling.

use std::sync::Arc;

use tracing::{debug, info, warn};

use slm_cache::keys;
use slm_core::config::SchedulerConfig;
use slm_core::result::AppResult;
use slm_core::traits::{CacheProvider, DeferredExecutor};
use slm_entity::job::DELAYED_RECALCULATION;
use slm_entity::usage::RecalculationReport;

use super::engine::RecalculationEngine;

/// Coalesces bursts of recalculation triggers into one deferred rescan.
///
/// A trigger takes a TTL lease with an atomic set-if-absent; only the
/// caller that gets the lease arranges the deferred job. The deferred run
/// drops the lease before scanning, so changes made during a scan trigger
/// a further pass.
#[derive(Debug, Clone)]
pub struct RecalculationScheduler {
    cache: Arc<dyn CacheProvider>,
    deferred: Arc<dyn DeferredExecutor>,
    engine: Arc<RecalculationEngine>,
    config: SchedulerConfig,
}

impl RecalculationScheduler {
    /// Create a scheduler.
    pub fn new(
        cache: Arc<dyn CacheProvider>,
        deferred: Arc<dyn DeferredExecutor>,
        engine: Arc<RecalculationEngine>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            cache,
            deferred,
            engine,
            config,
        }
    }

    /// Request a recalculation. Returns `true` if this call scheduled it,
    /// `false` if one was already pending.
    pub async fn schedule(&self) -> AppResult<bool> {
        let acquired = self
            .cache
            .set_nx(&keys::pending_recalculation(), "1", self.config.pending_ttl())
            .await?;
        if !acquired {
            debug!("Recalculation already pending");
            return Ok(false);
        }

        match self
            .deferred
            .schedule_once(self.config.delay(), DELAYED_RECALCULATION)
            .await
        {
            Ok(created) => {
                info!(
                    delay_seconds = self.config.delay_seconds,
                    created, "Recalculation scheduled"
                );
                Ok(true)
            }
            Err(e) => {
                if let Err(release) = self.cache.delete(&keys::pending_recalculation()).await {
                    warn!(error = %release, "Failed to release recalculation lease");
                }
                Err(e)
            }
        }
    }

    /// The deferred run: drop the lease, rescan, and flag the result.
    pub async fn run_delayed(&self) -> AppResult<RecalculationReport> {
        self.cache.delete(&keys::pending_recalculation()).await?;
        let report = self.engine.recalculate().await?;
        self.cache
            .set(&keys::auto_recalculated(), "1", self.config.auto_flag_ttl())
            .await?;
        Ok(report)
    }

    /// Rescan now, bypassing the debounce.
    pub async fn force_recalculate(&self) -> AppResult<RecalculationReport> {
        self.cache.delete(&keys::pending_recalculation()).await?;
        self.engine.recalculate().await
    }

    /// Whether a deferred run happened recently. Clears the flag.
    pub async fn take_auto_recalculated(&self) -> AppResult<bool> {
        if !self.cache.exists(&keys::auto_recalculated()).await? {
            return Ok(false);
        }
        self.cache.delete(&keys::auto_recalculated()).await?;
        Ok(true)
    }

    /// Whether the pending lease is held.
    pub async fn is_pending(&self) -> AppResult<bool> {
        self.cache.exists(&keys::pending_recalculation()).await
    }

    /// Drop the lease and the flag.
    pub async fn reset(&self) -> AppResult<()> {
        self.cache.delete(&keys::pending_recalculation()).await?;
        self.cache.delete(&keys::auto_recalculated()).await
    }
}
