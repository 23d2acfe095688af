//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_core::types::{PageRequest, PageResponse};
use slm_entity::job::{CreateJob, Job, JobStatus};

use crate::repositories::JobStore;

/// [`JobStore`] over a vector behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job, in insertion order.
    pub async fn all(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    /// Move every pending job's due time to now.
    pub async fn make_all_due(&self) {
        let now = Utc::now();
        for job in self.jobs.lock().await.iter_mut() {
            if job.status == JobStatus::Pending {
                job.scheduled_at = now;
            }
        }
    }
}

fn pending_with_key<'a>(jobs: &'a [Job], key: &str, except: Option<Uuid>) -> Option<&'a Job> {
    jobs.iter().find(|job| {
        job.status == JobStatus::Pending
            && job.dedup_key.as_deref() == Some(key)
            && Some(job.id) != except
    })
}

fn find_mut(jobs: &mut [Job], id: Uuid) -> AppResult<&mut Job> {
    jobs.iter_mut()
        .find(|job| job.id == id)
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, data: &CreateJob) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        if let Some(key) = &data.dedup_key {
            if pending_with_key(&jobs, key, None).is_some() {
                return Ok(None);
            }
        }
        let job = data.clone().into_job();
        jobs.push(job.clone());
        Ok(Some(job))
    }

    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|job| job.queue == queue && job.is_due(now))
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.scheduled_at.cmp(&b.scheduled_at))
            });
        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            job.worker_id = Some(worker_id.to_string());
            job.attempts += 1;
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        let job = find_mut(&mut jobs, id)?;
        job.status = JobStatus::Completed;
        job.result = result.cloned();
        job.completed_at = Some(Utc::now());
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        let job = find_mut(&mut jobs, id)?;
        job.status = JobStatus::Failed;
        job.error_message = Some(error_message.to_string());
        job.completed_at = Some(Utc::now());
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn retry_at(&self, id: Uuid, at: DateTime<Utc>, error_message: &str) -> AppResult<bool> {
        let mut jobs = self.jobs.lock().await;
        let key = find_mut(&mut jobs, id)?.dedup_key.clone();
        let superseded = key
            .as_deref()
            .is_some_and(|key| pending_with_key(&jobs, key, Some(id)).is_some());

        let job = find_mut(&mut jobs, id)?;
        job.updated_at = Utc::now();
        if superseded {
            job.status = JobStatus::Cancelled;
            job.error_message = Some(format!("{error_message} (superseded by a pending run)"));
            job.completed_at = Some(Utc::now());
            return Ok(false);
        }
        job.status = JobStatus::Pending;
        job.scheduled_at = at;
        job.error_message = Some(error_message.to_string());
        job.worker_id = None;
        Ok(true)
    }

    async fn has_pending(&self, dedup_key: &str) -> AppResult<bool> {
        let jobs = self.jobs.lock().await;
        Ok(pending_with_key(&jobs, dedup_key, None).is_some())
    }

    async fn find_all(&self, page: PageRequest) -> AppResult<PageResponse<Job>> {
        let jobs = self.jobs.lock().await;
        let items = jobs
            .iter()
            .rev()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(PageResponse::new(items, page, jobs.len() as u64))
    }

    async fn count_by_status(&self) -> AppResult<Vec<(JobStatus, u64)>> {
        let jobs = self.jobs.lock().await;
        let mut counts: HashMap<JobStatus, u64> = HashMap::new();
        for job in jobs.iter() {
            *counts.entry(job.status).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by_key(|(status, _)| status.as_str());
        Ok(counts)
    }

    async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let len = jobs.len();
        jobs.retain(|job| !(job.status.is_terminal() && job.updated_at < before));
        Ok((len - jobs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn recalculation() -> CreateJob {
        CreateJob::new("recalc", "accounting").dedup("recalc")
    }

    #[tokio::test]
    async fn test_dedup_among_pending() {
        let store = MemoryJobStore::new();
        assert!(store.create(&recalculation()).await.unwrap().is_some());
        assert!(store.create(&recalculation()).await.unwrap().is_none());
        assert!(store.has_pending("recalc").await.unwrap());

        let claimed = store.dequeue("accounting", "w1").await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);
        assert!(!store.has_pending("recalc").await.unwrap());
        assert!(store.create(&recalculation()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_future_jobs_not_dequeued() {
        let store = MemoryJobStore::new();
        let job = recalculation().run_at(Utc::now() + Duration::seconds(30));
        store.create(&job).await.unwrap();
        assert!(store.dequeue("accounting", "w1").await.unwrap().is_none());

        store.make_all_due().await;
        assert!(store.dequeue("accounting", "w1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_retry_superseded_by_pending() {
        let store = MemoryJobStore::new();
        store.create(&recalculation()).await.unwrap();
        let running = store.dequeue("accounting", "w1").await.unwrap().unwrap();
        store.create(&recalculation()).await.unwrap();

        let requeued = store
            .retry_at(running.id, Utc::now(), "boom")
            .await
            .unwrap();
        assert!(!requeued);
        let all = store.all().await;
        assert_eq!(all[0].status, JobStatus::Cancelled);
        assert_eq!(all[1].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_terminal_jobs() {
        let store = MemoryJobStore::new();
        let a = store.create(&CreateJob::new("a", "q")).await.unwrap().unwrap();
        store.create(&CreateJob::new("b", "q")).await.unwrap();
        store.complete(a.id, None).await.unwrap();

        let removed = store
            .cleanup_old(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.all().await.len(), 1);
    }
}
