//! Cron scheduler for periodic accounting tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use slm_core::config::SchedulerConfig;
use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_entity::job::{ACCOUNTING_QUEUE, CreateJob, JOB_CLEANUP, JobPriority, PERIODIC_RECALCULATION};

use crate::queue::JobQueue;

/// Daily purge of finished jobs.
const JOB_CLEANUP_CRON: &str = "0 30 4 * * *";

/// Cron-based scheduler that enqueues periodic jobs
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue for enqueuing scheduled work
    queue: Arc<JobQueue>,
    /// Periodic recalculation settings
    config: SchedulerConfig,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("periodic_cron", &self.config.periodic_cron)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>, config: SchedulerConfig) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::scheduling(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            queue,
            config,
        })
    }

    /// Register all default scheduled tasks
    pub async fn register_default_tasks(&self) -> AppResult<()> {
        if self.config.periodic_enabled {
            self.register(
                PERIODIC_RECALCULATION,
                &self.config.periodic_cron,
                JobPriority::Low,
            )
            .await?;
        } else {
            tracing::info!("Periodic recalculation disabled");
        }
        self.register(JOB_CLEANUP, JOB_CLEANUP_CRON, JobPriority::Low)
            .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::scheduling(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::scheduling(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Enqueue `job_type` on every tick of `cron`. A tick is skipped while
    /// the previous run is still pending.
    async fn register(&self, job_type: &'static str, cron: &str, priority: JobPriority) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::debug!(job_type, "Scheduling periodic job");
                let data = CreateJob::new(job_type, ACCOUNTING_QUEUE)
                    .priority(priority)
                    .dedup(job_type);
                if let Err(e) = queue.enqueue(data).await {
                    tracing::error!(job_type, error = %e, "Failed to enqueue periodic job");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{cron}' for {job_type}: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::scheduling(format!("Failed to add {job_type} schedule: {e}"))
        })?;

        tracing::info!(job_type, cron, "Registered periodic job");
        Ok(())
    }
}
