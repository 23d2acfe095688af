//! Storage limit manager daemon.
//!
//! Wires the accounting services to PostgreSQL (or in-process stores when no
//! database is configured), runs the deferred-job worker and the periodic
//! recalculation schedule until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use slm_cache::CacheManager;
use slm_core::config::AppConfig;
use slm_core::error::AppError;
use slm_core::traits::{CacheProvider, ObjectStore, OptionStore};
use slm_database::memory::{MemoryJobStore, MemoryObjectStore, MemoryOptionStore};
use slm_database::{AttachmentRepository, DatabasePool, JobStore, PgJobStore, PgOptionStore};
use slm_service::{AccountingDeps, AccountingServices, EventBus, ServiceOptions};
use slm_worker::{CronScheduler, JobQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("SLM_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("SLM_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Persistence collaborators for the services and the worker
struct Stores {
    options: Arc<dyn OptionStore>,
    objects: Arc<dyn ObjectStore>,
    jobs: Arc<dyn JobStore>,
    db: Option<DatabasePool>,
}

/// Connect to PostgreSQL, or fall back to in-process stores when no
/// database URL is configured
async fn open_stores(config: &AppConfig) -> Result<Stores, AppError> {
    if config.database.url.trim().is_empty() {
        tracing::warn!("No database configured, using in-process stores; nothing is persisted");
        return Ok(Stores {
            options: Arc::new(MemoryOptionStore::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
            db: None,
        });
    }

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        slm_database::migration::run_migrations(db.pool()).await?;
        tracing::info!("Database migrations complete");
    }

    let pool = db.pool().clone();
    Ok(Stores {
        options: Arc::new(PgOptionStore::new(pool.clone())),
        objects: Arc::new(AttachmentRepository::new(
            pool.clone(),
            &config.accounting.uploads_dir,
        )),
        jobs: Arc::new(PgJobStore::new(pool)),
        db: Some(db),
    })
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting storage limit manager");

    tokio::fs::create_dir_all(&config.accounting.uploads_dir).await?;

    let stores = open_stores(&config).await?;

    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = CacheManager::new(&config.cache).await?;
    if !cache.health_check().await? {
        return Err(AppError::cache("Cache backend did not answer the health check"));
    }

    let worker_id = config.worker.resolved_worker_id();
    let job_queue = Arc::new(JobQueue::new(Arc::clone(&stores.jobs), worker_id));
    let events = Arc::new(EventBus::default());

    let services = AccountingServices::new(
        AccountingDeps {
            options: Arc::clone(&stores.options),
            objects: Arc::clone(&stores.objects),
            cache: Arc::new(cache),
            deferred: job_queue.clone(),
            events,
        },
        ServiceOptions::from(&config),
    );

    let report = services.activate().await?;
    tracing::info!(
        total_bytes = report.total_bytes,
        processed = report.processed_count,
        missing = report.missing_count,
        "Initial usage computed"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut cron = None;
    let worker_handle = if config.worker.enabled {
        let executor = slm_worker::jobs::default_executor(
            Arc::clone(&services.scheduler),
            Arc::clone(&stores.jobs),
            config.worker.job_retention_days,
        );
        let runner = WorkerRunner::new(
            Arc::clone(&job_queue),
            Arc::new(executor),
            config.worker.clone(),
        );

        let scheduler = CronScheduler::new(Arc::clone(&job_queue), config.scheduler.clone()).await?;
        scheduler.register_default_tasks().await?;
        scheduler.start().await?;
        cron = Some(scheduler);

        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(worker_cancel).await;
        });

        tracing::info!("Background worker started");
        Some(handle)
    } else {
        tracing::info!("Background worker disabled; deferred recalculations wait for another worker");
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(mut scheduler) = cron {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Cron scheduler did not shut down cleanly");
        }
    }
    if let Some(handle) = worker_handle {
        if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
            tracing::warn!("Worker did not stop within 30s");
        }
    }
    if let Some(db) = stores.db {
        db.close().await;
    }

    tracing::info!("Storage limit manager shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
