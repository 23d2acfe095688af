//! Job row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobPriority, JobStatus};

/// A row of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Job identifier.
    pub id: Uuid,
    /// Handler key, e.g. `"slm_delayed_recalculation"`.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Priority.
    pub priority: JobPriority,
    /// Handler input.
    pub payload: serde_json::Value,
    /// Handler output on success.
    pub result: Option<serde_json::Value>,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Current status.
    pub status: JobStatus,
    /// Executions so far.
    pub attempts: i32,
    /// Executions allowed before the job fails for good.
    pub max_attempts: i32,
    /// At most one pending job may carry a given key.
    pub dedup_key: Option<String>,
    /// Earliest time the job may run.
    pub scheduled_at: DateTime<Utc>,
    /// When the current or last run started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker that claimed the job.
    pub worker_id: Option<String>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether another attempt is allowed after a transient failure.
    pub fn can_retry(&self) -> bool {
        !self.status.is_terminal() && self.attempts < self.max_attempts
    }

    /// Whether the job is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.scheduled_at <= now
    }
}

/// Data for inserting a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJob {
    /// Handler key.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Priority.
    pub priority: JobPriority,
    /// Handler input.
    pub payload: serde_json::Value,
    /// Attempt limit.
    pub max_attempts: i32,
    /// Earliest run time.
    pub scheduled_at: DateTime<Utc>,
    /// Deduplication key among pending jobs.
    pub dedup_key: Option<String>,
}

impl CreateJob {
    /// A normal-priority job due now with three attempts.
    pub fn new(job_type: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            queue: queue.into(),
            priority: JobPriority::Normal,
            payload: serde_json::Value::Object(serde_json::Map::new()),
            max_attempts: 3,
            scheduled_at: Utc::now(),
            dedup_key: None,
        }
    }

    /// Delay the first run.
    pub fn run_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = at;
        self
    }

    /// Make the job unique among pending jobs.
    pub fn dedup(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Materialise the row for an in-process store.
    pub fn into_job(self) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::now_v7(),
            job_type: self.job_type,
            queue: self.queue,
            priority: self.priority,
            payload: self.payload,
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            dedup_key: self.dedup_key,
            scheduled_at: self.scheduled_at,
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
