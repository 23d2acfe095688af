//! Versioned key-value persistence for settings and the usage record.

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;

/// A stored option together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    /// The stored JSON document.
    pub value: Value,
    /// Monotonic version, bumped on every write.
    pub version: i64,
}

/// Persistent named options (the equivalent of a settings table).
///
/// Every failure is a persistence failure and must be surfaced to the
/// caller; implementations never substitute defaults for errors.
#[async_trait]
pub trait OptionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Read an option. `None` means it was never written (or was deleted).
    async fn get(&self, name: &str) -> AppResult<Option<VersionedValue>>;

    /// Unconditionally write an option.
    async fn put(&self, name: &str, value: &Value) -> AppResult<()>;

    /// Write an option only if its current version matches.
    ///
    /// `expected_version = None` means "only if absent". Returns `false`
    /// when another writer got there first.
    async fn compare_and_swap(
        &self,
        name: &str,
        expected_version: Option<i64>,
        value: &Value,
    ) -> AppResult<bool>;

    /// Delete an option. Returns `true` if it existed.
    ///
    /// Versions are never reused: a re-created option continues from the
    /// deleted one's version, so a compare-and-swap against a version read
    /// before the delete fails.
    async fn delete(&self, name: &str) -> AppResult<bool>;
}
