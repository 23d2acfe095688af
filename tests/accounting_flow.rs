//! End-to-end accounting flow over in-process stores: lifecycle updates,
//! debounced recalculation through the job worker, drift correction, and
//! quota decisions.

use std::sync::Arc;

use slm_cache::CacheManager;
use slm_core::config::{CacheConfig, WorkerConfig};
use slm_database::memory::{MemoryJobStore, MemoryObjectStore, MemoryOptionStore};
use slm_entity::job::{JobStatus, PERIODIC_RECALCULATION};
use slm_entity::quota::SettingsPatch;
use slm_entity::usage::UsageStatus;
use slm_service::{AccountingDeps, AccountingServices, EventBus, ServiceOptions};
use slm_worker::runner::JobOutcome;
use slm_worker::{JobQueue, WorkerRunner};

const MB: u64 = 1024 * 1024;

struct TestApp {
    services: AccountingServices,
    objects: Arc<MemoryObjectStore>,
    jobs: Arc<MemoryJobStore>,
    queue: Arc<JobQueue>,
    runner: WorkerRunner,
}

impl TestApp {
    async fn new() -> Self {
        let objects = Arc::new(MemoryObjectStore::new());
        let jobs = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(JobQueue::new(jobs.clone(), "itest".to_string()));
        let cache = CacheManager::new(&CacheConfig::default())
            .await
            .expect("memory cache");

        let services = AccountingServices::new(
            AccountingDeps {
                options: Arc::new(MemoryOptionStore::new()),
                objects: objects.clone(),
                cache: Arc::new(cache),
                deferred: queue.clone(),
                events: Arc::new(EventBus::default()),
            },
            ServiceOptions::default(),
        );
        let executor = slm_worker::jobs::default_executor(services.scheduler.clone(), jobs.clone(), 7);
        let runner = WorkerRunner::new(queue.clone(), Arc::new(executor), WorkerConfig::default());

        Self {
            services,
            objects,
            jobs,
            queue,
            runner,
        }
    }

    /// Run every job that is due or becomes due.
    async fn drain(&self) -> Vec<JobOutcome> {
        self.jobs.make_all_due().await;
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.runner.run_once().await.expect("worker") {
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[tokio::test]
async fn test_uploads_are_counted_and_reconciled() {
    let app = TestApp::new().await;
    app.services.activate().await.unwrap();
    app.services
        .settings
        .update_settings(&SettingsPatch {
            max_storage_mb: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..5 {
        let id = format!("img-{i}");
        let path = format!("/uploads/{id}.jpg");
        let handle = app
            .objects
            .insert(&id, Some("image/jpeg"), Some(&path), Some(MB))
            .await;
        app.services.lifecycle.on_object_created(&handle).await.unwrap();
        handles.push(handle);
    }

    // Five uploads, one deferred job.
    assert_eq!(app.jobs.all().await.len(), 1);
    assert_eq!(app.services.usage_store.get_current_usage().await.unwrap(), 5 * MB);

    // A file disappears behind the tracker's back.
    app.objects.remove_file("/uploads/img-4.jpg").await;

    assert_eq!(app.drain().await, vec![JobOutcome::Completed]);
    assert_eq!(app.services.usage_store.get_current_usage().await.unwrap(), 4 * MB);
    assert!(app.services.scheduler.take_auto_recalculated().await.unwrap());

    let snapshot = app.services.stats.get_snapshot().await.unwrap();
    assert_eq!(snapshot.max_bytes, 10 * MB);
    assert_eq!(snapshot.percentage_used, 40.0);
    assert_eq!(snapshot.status, UsageStatus::Normal);
    assert_eq!(snapshot.formatted.total, "4 MB");

    app.services.lifecycle.on_object_deleted(&handles[0]).await.unwrap();
    app.objects.remove("img-0").await;
    assert_eq!(app.services.usage_store.get_current_usage().await.unwrap(), 3 * MB);
}

#[tokio::test]
async fn test_quota_blocks_once_full() {
    let app = TestApp::new().await;
    app.services
        .settings
        .update_settings(&SettingsPatch {
            max_storage_mb: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();

    let handle = app
        .objects
        .insert("big", Some("video/mp4"), Some("/big.mp4"), Some(MB + MB / 2))
        .await;
    assert!(app.services.guard.evaluate_upload(MB + MB / 2).await.unwrap().allowed);
    app.services.lifecycle.on_object_created(&handle).await.unwrap();

    let decision = app.services.guard.evaluate_upload(MB).await.unwrap();
    assert!(!decision.allowed);
    assert!(decision.message.unwrap().contains("2 MB"));
    assert_eq!(
        app.services.guard.max_uploadable_size(None).await.unwrap(),
        MB / 2
    );

    app.services
        .settings
        .update_settings(&SettingsPatch {
            block_uploads: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(app.services.guard.evaluate_upload(MB).await.unwrap().allowed);
}

#[tokio::test]
async fn test_periodic_job_corrects_drift() {
    let app = TestApp::new().await;
    app.objects.insert("a", None, Some("/a"), Some(700)).await;
    app.services.usage_store.apply_delta(123_456).await.unwrap();

    app.queue
        .enqueue(
            slm_entity::job::CreateJob::new(PERIODIC_RECALCULATION, slm_entity::job::ACCOUNTING_QUEUE)
                .dedup(PERIODIC_RECALCULATION),
        )
        .await
        .unwrap();
    assert_eq!(app.drain().await, vec![JobOutcome::Completed]);
    assert_eq!(app.services.usage_store.get_current_usage().await.unwrap(), 700);

    let statuses: Vec<_> = app.jobs.all().await.iter().map(|j| j.status).collect();
    assert_eq!(statuses, vec![JobStatus::Completed]);
}

#[tokio::test]
async fn test_uninstall_then_reactivate() {
    let app = TestApp::new().await;
    app.objects.insert("a", None, Some("/a"), Some(10)).await;
    app.services.activate().await.unwrap();
    app.services.uninstall().await.unwrap();

    assert!(!app.services.settings.settings_exist().await.unwrap());
    assert_eq!(app.services.usage_store.get_current_usage().await.unwrap(), 0);

    let report = app.services.activate().await.unwrap();
    assert_eq!(report.total_bytes, 10);
}
