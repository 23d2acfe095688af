//! Usage recalculation job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use slm_entity::job::{DELAYED_RECALCULATION, Job, PERIODIC_RECALCULATION};
use slm_entity::usage::RecalculationReport;
use slm_service::RecalculationScheduler;

use crate::executor::{JobExecutionError, JobHandler};

/// Runs recalculations on behalf of the job handlers below
#[derive(Debug)]
pub struct RecalculationJobHandler {
    /// Debounced scheduler owning the lease and the engine
    scheduler: Arc<RecalculationScheduler>,
}

impl RecalculationJobHandler {
    /// Create a new recalculation job handler
    pub fn new(scheduler: Arc<RecalculationScheduler>) -> Self {
        Self { scheduler }
    }

    /// The debounced run requested by a burst of triggers
    async fn run_delayed(&self) -> Result<Value, JobExecutionError> {
        tracing::info!("Running delayed usage recalculation");
        let report = self
            .scheduler
            .run_delayed()
            .await
            .map_err(JobExecutionError::classify)?;
        Ok(report_json("delayed", &report))
    }

    /// The periodic drift correction
    async fn run_periodic(&self) -> Result<Value, JobExecutionError> {
        tracing::info!("Running periodic usage recalculation");
        let report = self
            .scheduler
            .force_recalculate()
            .await
            .map_err(JobExecutionError::classify)?;
        Ok(report_json("periodic", &report))
    }
}

fn report_json(trigger: &str, report: &RecalculationReport) -> Value {
    serde_json::json!({
        "trigger": trigger,
        "total_bytes": report.total_bytes,
        "processed": report.processed_count,
        "missing": report.missing_count,
    })
}

/// Handler for the debounced recalculation job type
#[derive(Debug)]
pub struct DelayedRecalculationHandler {
    /// Inner recalculation handler
    inner: Arc<RecalculationJobHandler>,
}

impl DelayedRecalculationHandler {
    /// Create a new delayed recalculation handler
    pub fn new(inner: Arc<RecalculationJobHandler>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl JobHandler for DelayedRecalculationHandler {
    fn job_type(&self) -> &str {
        DELAYED_RECALCULATION
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let result = self.inner.run_delayed().await?;
        Ok(Some(result))
    }
}

/// Handler for the periodic recalculation job type
#[derive(Debug)]
pub struct PeriodicRecalculationHandler {
    /// Inner recalculation handler
    inner: Arc<RecalculationJobHandler>,
}

impl PeriodicRecalculationHandler {
    /// Create a new periodic recalculation handler
    pub fn new(inner: Arc<RecalculationJobHandler>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl JobHandler for PeriodicRecalculationHandler {
    fn job_type(&self) -> &str {
        PERIODIC_RECALCULATION
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let result = self.inner.run_periodic().await?;
        Ok(Some(result))
    }
}
