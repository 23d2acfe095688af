//! Built-in job handler implementations.

pub mod cleanup;
pub mod recalculation;

pub use cleanup::JobCleanupHandler;
pub use recalculation::{
    DelayedRecalculationHandler, PeriodicRecalculationHandler, RecalculationJobHandler,
};

use std::sync::Arc;

use slm_database::repositories::job::JobStore;
use slm_service::RecalculationScheduler;

use crate::executor::JobExecutor;

/// An executor with every accounting job handler registered.
pub fn default_executor(
    scheduler: Arc<RecalculationScheduler>,
    jobs: Arc<dyn JobStore>,
    retention_days: i64,
) -> JobExecutor {
    let inner = Arc::new(RecalculationJobHandler::new(scheduler));
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(DelayedRecalculationHandler::new(Arc::clone(&inner))));
    executor.register(Arc::new(PeriodicRecalculationHandler::new(inner)));
    executor.register(Arc::new(JobCleanupHandler::new(jobs, retention_days)));
    executor
}
