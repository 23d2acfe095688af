//! Debounced recalculation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the debounced and periodic recalculation passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Lifetime of the pending-recalculation lease in seconds.
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_seconds: u64,
    /// Delay before a scheduled recalculation runs, in seconds.
    #[serde(default = "default_delay")]
    pub delay_seconds: u64,
    /// Lifetime of the "auto-recalculated" flag in seconds.
    #[serde(default = "default_auto_flag_ttl")]
    pub auto_flag_ttl_seconds: u64,
    /// Whether the periodic drift-correction rescan is registered.
    #[serde(default = "default_true")]
    pub periodic_enabled: bool,
    /// Cron expression (with seconds) for the periodic rescan.
    #[serde(default = "default_periodic_cron")]
    pub periodic_cron: String,
}

impl SchedulerConfig {
    /// Pending lease TTL.
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_seconds)
    }

    /// Delay before the deferred run.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Auto-recalculated flag TTL.
    pub fn auto_flag_ttl(&self) -> Duration {
        Duration::from_secs(self.auto_flag_ttl_seconds)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pending_ttl_seconds: default_pending_ttl(),
            delay_seconds: default_delay(),
            auto_flag_ttl_seconds: default_auto_flag_ttl(),
            periodic_enabled: true,
            periodic_cron: default_periodic_cron(),
        }
    }
}

fn default_pending_ttl() -> u64 {
    60
}

fn default_delay() -> u64 {
    30
}

fn default_auto_flag_ttl() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_periodic_cron() -> String {
    "0 0 3 * * *".to_string()
}
