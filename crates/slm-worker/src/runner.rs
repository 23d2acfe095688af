//! Worker runner: the loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use slm_core::config::WorkerConfig;
use slm_core::result::AppResult;
use slm_entity::job::{ACCOUNTING_QUEUE, Job};

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// First retry delay; doubled per attempt.
const BASE_RETRY_SECONDS: i64 = 30;

/// Upper bound on the retry delay.
const MAX_RETRY_SECONDS: i64 = 3600;

/// How long shutdown waits for in-flight jobs.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// What became of a job after one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Failed transiently and was put back for a later attempt.
    Retrying,
    /// Failed transiently, but a newer pending run made it redundant.
    Superseded,
    Failed,
}

/// Main worker runner that polls queues and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
    /// Queues to poll (in priority order)
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a new worker runner polling the accounting queue
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            queues: vec![ACCOUNTING_QUEUE.to_string()],
        }
    }

    /// Start the worker runner; runs until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let worker_id = self.queue.worker_id().to_string();
        tracing::info!(
            %worker_id,
            concurrency = self.config.concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            queues = ?self.queues,
            "Worker started"
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!(%worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                claimed = self.poll_and_spawn(&semaphore) => {
                    if claimed {
                        continue;
                    }
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!(%worker_id, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(%worker_id, "Waiting for in-flight jobs to complete");
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(SHUTDOWN_GRACE, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            tracing::warn!(%worker_id, "In-flight jobs still running at shutdown");
        }

        tracing::info!(%worker_id, "Worker shut down complete");
    }

    /// Claim and execute at most one job inline.
    pub async fn run_once(&self) -> AppResult<Option<JobOutcome>> {
        let queue_refs: Vec<&str> = self.queues.iter().map(String::as_str).collect();
        let Some(job) = self.queue.dequeue(&queue_refs).await? else {
            return Ok(None);
        };
        process(&self.queue, &self.executor, job).await.map(Some)
    }

    /// Wait for a free slot, then claim a job and run it on its own task.
    /// Returns whether a job was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<Semaphore>) -> bool {
        let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
            return false;
        };

        let queue_refs: Vec<&str> = self.queues.iter().map(String::as_str).collect();
        match self.queue.dequeue(&queue_refs).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    let job_id = job.id;
                    if let Err(e) = process(&queue, &executor, job).await {
                        tracing::error!(%job_id, error = %e, "Failed to record job outcome");
                    }
                });
                true
            }
            Ok(None) => {
                tracing::trace!("No jobs available in queues");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to dequeue job");
                false
            }
        }
    }
}

/// Execute a claimed job and record the outcome.
async fn process(queue: &JobQueue, executor: &JobExecutor, job: Job) -> AppResult<JobOutcome> {
    let job_id = job.id;

    match executor.execute(&job).await {
        Ok(result) => {
            queue.complete(job_id, result.as_ref()).await?;
            tracing::info!(%job_id, job_type = %job.job_type, "Job completed");
            Ok(JobOutcome::Completed)
        }
        Err(JobExecutionError::Transient(msg)) if job.can_retry() => {
            let at = Utc::now() + chrono::Duration::seconds(retry_delay_seconds(job.attempts));
            tracing::warn!(%job_id, error = %msg, retry_at = %at, "Job failed (transient)");
            if queue.retry_at(job_id, at, &msg).await? {
                Ok(JobOutcome::Retrying)
            } else {
                Ok(JobOutcome::Superseded)
            }
        }
        Err(e) => {
            let msg = e.to_string();
            tracing::error!(%job_id, error = %msg, "Job failed permanently");
            queue.fail(job_id, &msg).await?;
            Ok(JobOutcome::Failed)
        }
    }
}

/// Delay before the attempt following attempt number `attempts`.
fn retry_delay_seconds(attempts: i32) -> i64 {
    let exponent = u32::try_from(attempts.saturating_sub(1).clamp(0, 16)).unwrap_or(0);
    BASE_RETRY_SECONDS
        .saturating_mul(1i64 << exponent)
        .min(MAX_RETRY_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use slm_database::memory::MemoryJobStore;
    use slm_entity::job::{CreateJob, JobStatus};

    use crate::executor::JobHandler;

    /// Fails transiently `failures` times, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobHandler for Flaky {
        fn job_type(&self) -> &str {
            "flaky"
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(JobExecutionError::Transient("not yet".to_string()));
            }
            Ok(Some(serde_json::json!({ "calls": call + 1 })))
        }
    }

    fn runner(failures: u32) -> (Arc<MemoryJobStore>, Arc<JobQueue>, WorkerRunner) {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(JobQueue::new(store.clone(), "w1".to_string()));
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
        }));
        let runner = WorkerRunner::new(queue.clone(), Arc::new(executor), WorkerConfig::default());
        (store, queue, runner)
    }

    #[test]
    fn test_retry_delay_backs_off() {
        assert_eq!(retry_delay_seconds(1), 30);
        assert_eq!(retry_delay_seconds(2), 60);
        assert_eq!(retry_delay_seconds(3), 120);
        assert_eq!(retry_delay_seconds(50), MAX_RETRY_SECONDS);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_completes() {
        let (store, queue, runner) = runner(1);
        queue
            .enqueue(CreateJob::new("flaky", ACCOUNTING_QUEUE))
            .await
            .unwrap();

        assert_eq!(runner.run_once().await.unwrap(), Some(JobOutcome::Retrying));
        assert_eq!(runner.run_once().await.unwrap(), None);

        store.make_all_due().await;
        assert_eq!(runner.run_once().await.unwrap(), Some(JobOutcome::Completed));

        let job = &store.all().await[0];
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.attempts, 2);
        assert_eq!(job.result, Some(serde_json::json!({ "calls": 2 })));
    }

    #[tokio::test]
    async fn test_attempts_exhausted_fails() {
        let (store, queue, runner) = runner(10);
        let mut data = CreateJob::new("flaky", ACCOUNTING_QUEUE);
        data.max_attempts = 2;
        queue.enqueue(data).await.unwrap();

        assert_eq!(runner.run_once().await.unwrap(), Some(JobOutcome::Retrying));
        store.make_all_due().await;
        assert_eq!(runner.run_once().await.unwrap(), Some(JobOutcome::Failed));
        assert_eq!(store.all().await[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_retry_superseded_by_pending_duplicate() {
        let (store, queue, runner) = runner(1);
        queue
            .enqueue(CreateJob::new("flaky", ACCOUNTING_QUEUE).dedup("k"))
            .await
            .unwrap();
        let claimed = queue.dequeue(&[ACCOUNTING_QUEUE]).await.unwrap().unwrap();
        queue
            .enqueue(CreateJob::new("flaky", ACCOUNTING_QUEUE).dedup("k"))
            .await
            .unwrap()
            .unwrap();

        let outcome = process(&queue, &runner.executor, claimed).await.unwrap();
        assert_eq!(outcome, JobOutcome::Superseded);
        let statuses: Vec<_> = store.all().await.iter().map(|j| j.status).collect();
        assert_eq!(statuses, vec![JobStatus::Cancelled, JobStatus::Pending]);
    }

    #[tokio::test]
    async fn test_unknown_job_type_fails() {
        let (store, queue, runner) = runner(0);
        queue
            .enqueue(CreateJob::new("mystery", ACCOUNTING_QUEUE))
            .await
            .unwrap();
        assert_eq!(runner.run_once().await.unwrap(), Some(JobOutcome::Failed));
        assert_eq!(store.all().await[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_run_loop_drains_and_stops() {
        let (store, queue, runner) = runner(0);
        for _ in 0..3 {
            queue
                .enqueue(CreateJob::new("flaky", ACCOUNTING_QUEUE))
                .await
                .unwrap();
        }

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });
        for _ in 0..100 {
            let done = store
                .all()
                .await
                .iter()
                .all(|j| j.status == JobStatus::Completed);
            if done {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(
            store
                .all()
                .await
                .iter()
                .all(|j| j.status == JobStatus::Completed)
        );
    }
}
