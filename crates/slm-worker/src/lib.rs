//! Durable deferred execution for the accounting service.
//!
//! This crate provides:
//! - A job queue that persists one-shot runs and implements `DeferredExecutor`
//! - A worker runner that polls for and executes queued jobs
//! - A job executor that dispatches jobs to the correct handler
//! - A cron scheduler for the periodic drift-correction rescan
//! - Job handlers for recalculation and finished-job cleanup

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{JobQueue, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
