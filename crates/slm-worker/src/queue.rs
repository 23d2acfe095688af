//! Job queue for enqueuing and dequeuing background jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing;
use uuid::Uuid;

use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_core::traits::DeferredExecutor;
use slm_core::types::{PageRequest, PageResponse};
use slm_database::repositories::job::JobStore;
use slm_entity::job::{ACCOUNTING_QUEUE, CreateJob, Job, JobStatus};

/// Job queue for enqueuing and dequeuing work
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Durable job storage
    store: Arc<dyn JobStore>,
    /// Worker identifier for claiming jobs
    worker_id: String,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, worker_id: String) -> Self {
        Self { store, worker_id }
    }

    /// Worker identifier used when claiming jobs
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a new job. Returns `None` when a pending job with the same
    /// dedup key already exists.
    pub async fn enqueue(&self, data: CreateJob) -> AppResult<Option<Job>> {
        let job = self.store.create(&data).await?;

        match &job {
            Some(job) => tracing::debug!(
                job_id = %job.id,
                job_type = %job.job_type,
                queue = %job.queue,
                scheduled_at = %job.scheduled_at,
                "Enqueued job"
            ),
            None => tracing::debug!(
                job_type = %data.job_type,
                dedup_key = ?data.dedup_key,
                "Job already pending, not enqueued"
            ),
        }

        Ok(job)
    }

    /// Dequeue the next available job from the given queues, in order
    pub async fn dequeue(&self, queues: &[&str]) -> AppResult<Option<Job>> {
        for queue in queues {
            if let Some(job) = self.store.dequeue(queue, &self.worker_id).await? {
                tracing::debug!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    queue = %job.queue,
                    "Dequeued job"
                );
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Mark a job as completed successfully
    pub async fn complete(&self, job_id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        self.store.complete(job_id, result).await?;
        tracing::debug!(%job_id, "Job completed");
        Ok(())
    }

    /// Mark a job as failed
    pub async fn fail(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.store.fail(job_id, error).await?;
        tracing::debug!(%job_id, error, "Job failed");
        Ok(())
    }

    /// Put a job back for another attempt at `at`. Returns `false` when a
    /// newer pending run made it redundant.
    pub async fn retry_at(&self, job_id: Uuid, at: DateTime<Utc>, error: &str) -> AppResult<bool> {
        let requeued = self.store.retry_at(job_id, at, error).await?;
        tracing::debug!(%job_id, %at, requeued, "Job retry arranged");
        Ok(requeued)
    }

    /// Jobs of every status, newest first
    pub async fn recent(&self, page: PageRequest) -> AppResult<PageResponse<Job>> {
        self.store.find_all(page).await
    }

    /// Get queue statistics
    pub async fn stats(&self) -> AppResult<QueueStats> {
        let counts = self.store.count_by_status().await?;
        let count = |status: JobStatus| {
            counts
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n)
        };

        Ok(QueueStats {
            pending: count(JobStatus::Pending),
            running: count(JobStatus::Running),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            cancelled: count(JobStatus::Cancelled),
            worker_id: self.worker_id.clone(),
        })
    }
}

#[async_trait]
impl DeferredExecutor for JobQueue {
    async fn schedule_once(&self, delay: Duration, job_key: &str) -> AppResult<bool> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| AppError::scheduling(format!("Invalid delay for '{job_key}': {e}")))?;
        let data = CreateJob::new(job_key, ACCOUNTING_QUEUE)
            .run_at(Utc::now() + delay)
            .dedup(job_key);

        let created = self
            .enqueue(data)
            .await
            .map_err(|e| AppError::scheduling(format!("Failed to schedule '{job_key}': {e}")))?;
        Ok(created.is_some())
    }

    async fn is_scheduled(&self, job_key: &str) -> AppResult<bool> {
        self.store.has_pending(job_key).await
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs
    pub pending: u64,
    /// Number of running jobs
    pub running: u64,
    /// Number of completed jobs still retained
    pub completed: u64,
    /// Number of failed jobs
    pub failed: u64,
    /// Number of cancelled jobs
    pub cancelled: u64,
    /// Current worker identifier
    pub worker_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slm_core::error::ErrorKind;
    use slm_database::memory::MemoryJobStore;
    use slm_entity::job::DELAYED_RECALCULATION;

    fn queue() -> (Arc<MemoryJobStore>, JobQueue) {
        let store = Arc::new(MemoryJobStore::new());
        let queue = JobQueue::new(store.clone(), "test-worker".to_string());
        (store, queue)
    }

    #[tokio::test]
    async fn test_schedule_once_is_idempotent_while_pending() {
        let (store, queue) = queue();
        let delay = Duration::from_secs(30);

        assert!(queue.schedule_once(delay, DELAYED_RECALCULATION).await.unwrap());
        assert!(!queue.schedule_once(delay, DELAYED_RECALCULATION).await.unwrap());
        assert!(queue.is_scheduled(DELAYED_RECALCULATION).await.unwrap());

        let jobs = store.all().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].queue, ACCOUNTING_QUEUE);
        assert!(jobs[0].scheduled_at > Utc::now() + chrono::Duration::seconds(20));
    }

    #[tokio::test]
    async fn test_delayed_job_not_dequeued_early() {
        let (store, queue) = queue();
        queue
            .schedule_once(Duration::from_secs(60), DELAYED_RECALCULATION)
            .await
            .unwrap();
        assert!(queue.dequeue(&[ACCOUNTING_QUEUE]).await.unwrap().is_none());

        store.make_all_due().await;
        let job = queue.dequeue(&[ACCOUNTING_QUEUE]).await.unwrap().unwrap();
        assert_eq!(job.job_type, DELAYED_RECALCULATION);
        assert_eq!(job.worker_id.as_deref(), Some("test-worker"));

        // A claimed job no longer blocks a new one.
        assert!(!queue.is_scheduled(DELAYED_RECALCULATION).await.unwrap());
        assert!(
            queue
                .schedule_once(Duration::from_secs(60), DELAYED_RECALCULATION)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (_, queue) = queue();
        queue.enqueue(CreateJob::new("a", ACCOUNTING_QUEUE)).await.unwrap();
        queue.enqueue(CreateJob::new("b", ACCOUNTING_QUEUE)).await.unwrap();
        let job = queue.dequeue(&[ACCOUNTING_QUEUE]).await.unwrap().unwrap();
        queue.fail(job.id, "boom").await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        let recent = queue.recent(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(recent.total_items, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.worker_id, "test-worker");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (_, queue) = queue();
        let err = queue.complete(Uuid::new_v4(), None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
