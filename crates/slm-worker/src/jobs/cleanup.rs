//! Purge of finished jobs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing;

use slm_database::repositories::job::JobStore;
use slm_entity::job::{JOB_CLEANUP, Job};

use crate::executor::{JobExecutionError, JobHandler};

/// Deletes completed, failed, and cancelled jobs past their retention
#[derive(Debug)]
pub struct JobCleanupHandler {
    /// Job storage
    jobs: Arc<dyn JobStore>,
    /// Days a finished job is kept
    retention_days: i64,
}

impl JobCleanupHandler {
    /// Create a new job cleanup handler
    pub fn new(jobs: Arc<dyn JobStore>, retention_days: i64) -> Self {
        Self {
            jobs,
            retention_days: retention_days.max(0),
        }
    }
}

#[async_trait]
impl JobHandler for JobCleanupHandler {
    fn job_type(&self) -> &str {
        JOB_CLEANUP
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let removed = self
            .jobs
            .cleanup_old(cutoff)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Job cleanup failed: {e}")))?;

        tracing::info!(removed, retention_days = self.retention_days, "Cleaned up old jobs");

        Ok(Some(serde_json::json!({
            "task": JOB_CLEANUP,
            "jobs_removed": removed,
        })))
    }
}
