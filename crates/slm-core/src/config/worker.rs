//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Identifier recorded on claimed jobs. Defaults to `slm-worker-<pid>`.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Retention in days for finished jobs before they are purged.
    #[serde(default = "default_retention_days")]
    pub job_retention_days: i64,
}

impl WorkerConfig {
    /// The effective worker identifier.
    pub fn resolved_worker_id(&self) -> String {
        self.worker_id
            .clone()
            .unwrap_or_else(|| format!("slm-worker-{}", std::process::id()))
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            worker_id: None,
            job_retention_days: default_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    5
}

fn default_retention_days() -> i64 {
    7
}
