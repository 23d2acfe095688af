//! Shared fixtures for the unit tests in this crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use slm_cache::CacheManager;
use slm_core::config::CacheConfig;
use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_core::traits::DeferredExecutor;
use slm_database::memory::{MemoryObjectStore, MemoryOptionStore};

use crate::events::EventBus;
use crate::{AccountingDeps, AccountingServices, ServiceOptions};

/// Records scheduled job keys instead of running them.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor whose every call fails.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::default(),
            failing: true,
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl DeferredExecutor for RecordingExecutor {
    async fn schedule_once(&self, _delay: Duration, job_key: &str) -> AppResult<bool> {
        if self.failing {
            return Err(AppError::scheduling("job queue unavailable"));
        }
        self.calls.lock().await.push(job_key.to_string());
        Ok(true)
    }

    async fn is_scheduled(&self, job_key: &str) -> AppResult<bool> {
        Ok(self.calls.lock().await.iter().any(|k| k == job_key))
    }
}

/// Services over in-memory collaborators with handles to each of them.
pub struct Harness {
    pub services: AccountingServices,
    pub options: Arc<MemoryOptionStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub executor: Arc<RecordingExecutor>,
    pub bus: Arc<EventBus>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_executor(RecordingExecutor::new()).await
    }

    pub async fn with_executor(executor: RecordingExecutor) -> Self {
        let options = Arc::new(MemoryOptionStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let executor = Arc::new(executor);
        let bus = Arc::new(EventBus::default());
        let cache = CacheManager::new(&CacheConfig::default()).await.unwrap();

        let services = AccountingServices::new(
            AccountingDeps {
                options: options.clone(),
                objects: objects.clone(),
                cache: Arc::new(cache),
                deferred: executor.clone(),
                events: bus.clone(),
            },
            ServiceOptions::default(),
        );

        Self {
            services,
            options,
            objects,
            executor,
            bus,
        }
    }
}
