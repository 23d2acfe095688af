//! Durable job storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use slm_core::error::{AppError, ErrorKind};
use slm_core::result::AppResult;
use slm_core::types::{PageRequest, PageResponse};
use slm_entity::job::{CreateJob, Job, JobStatus};

/// Persistence of background jobs.
///
/// At most one `pending` job may carry a given `dedup_key`.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a job. Returns `None` if a pending job with the same
    /// `dedup_key` already exists.
    async fn create(&self, data: &CreateJob) -> AppResult<Option<Job>>;

    /// Claim the next due job of `queue`, marking it running.
    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>>;

    /// Mark a job completed.
    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()>;

    /// Mark a job failed for good.
    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()>;

    /// Put a job back to pending, due at `at`.
    ///
    /// Returns `false` (and cancels the job) when another pending job
    /// already holds its `dedup_key`.
    async fn retry_at(&self, id: Uuid, at: DateTime<Utc>, error_message: &str) -> AppResult<bool>;

    /// Whether a pending job carries `dedup_key`.
    async fn has_pending(&self, dedup_key: &str) -> AppResult<bool>;

    /// List jobs, newest first.
    async fn find_all(&self, page: PageRequest) -> AppResult<PageResponse<Job>>;

    /// Number of jobs per status.
    async fn count_by_status(&self) -> AppResult<Vec<(JobStatus, u64)>>;

    /// Delete terminal jobs last updated before `before`.
    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// [`JobStore`] over the `jobs` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so any number of workers may poll
/// the same queue.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a store on `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Persistence, context, e)
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, data: &CreateJob) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (job_type, queue, priority, payload, max_attempts, scheduled_at, dedup_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (dedup_key) WHERE status = 'pending' AND dedup_key IS NOT NULL DO NOTHING \
             RETURNING *",
        )
        .bind(&data.job_type)
        .bind(&data.queue)
        .bind(data.priority)
        .bind(&data.payload)
        .bind(data.max_attempts)
        .bind(data.scheduled_at)
        .bind(&data.dedup_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to create job"))
    }

    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = NOW(), worker_id = $2, \
             attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE queue = $1 AND status = 'pending' AND scheduled_at <= NOW() \
                ORDER BY \
                    CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 ELSE 2 END, \
                    scheduled_at ASC \
                LIMIT 1 \
                FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to dequeue job"))
    }

    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to complete job"))?;
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to mark job as failed"))?;
        Ok(())
    }

    async fn retry_at(&self, id: Uuid, at: DateTime<Utc>, error_message: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', scheduled_at = $2, error_message = $3, \
             worker_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND NOT EXISTS ( \
                SELECT 1 FROM jobs other \
                WHERE other.dedup_key = jobs.dedup_key AND other.status = 'pending' \
                AND other.id <> jobs.id \
             )",
        )
        .bind(id)
        .bind(at)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to reschedule job"))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        sqlx::query(
            "UPDATE jobs SET status = 'cancelled', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(format!("{error_message} (superseded by a pending run)"))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to cancel superseded job"))?;
        Ok(false)
    }

    async fn has_pending(&self, dedup_key: &str) -> AppResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM jobs WHERE dedup_key = $1 AND status = 'pending')",
        )
        .bind(dedup_key)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to look up pending job"))
    }

    async fn find_all(&self, page: PageRequest) -> AppResult<PageResponse<Job>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count jobs"))?;

        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list jobs"))?;

        Ok(PageResponse::new(jobs, page, total.max(0) as u64))
    }

    async fn count_by_status(&self) -> AppResult<Vec<(JobStatus, u64)>> {
        let rows: Vec<(JobStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to count jobs by status"))?;
        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, count.max(0) as u64))
            .collect())
    }

    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('completed', 'failed', 'cancelled') \
             AND updated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to clean up jobs"))?;
        Ok(result.rows_affected())
    }
}
