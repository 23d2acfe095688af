//! Durable one-shot scheduling.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A facility that runs a named job once after a delay, outliving the
/// process that asked for it.
#[async_trait]
pub trait DeferredExecutor: Send + Sync + std::fmt::Debug + 'static {
    /// Arrange for `job_key` to run after `delay`.
    ///
    /// Returns `false` without scheduling anything if a run of the same key
    /// is already pending.
    async fn schedule_once(&self, delay: Duration, job_key: &str) -> AppResult<bool>;

    /// Whether a run of `job_key` is pending.
    async fn is_scheduled(&self, job_key: &str) -> AppResult<bool>;
}
