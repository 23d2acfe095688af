//! The usage record and its only writer.

use std::sync::Arc;

use tracing::{debug, warn};

use slm_core::error::AppError;
use slm_core::events::UsageEvent;
use slm_core::result::AppResult;
use slm_core::traits::{EventSink, OptionStore, VersionedValue};
use slm_entity::usage::UsageRecord;
use slm_entity::usage::record::USAGE_OPTION;

/// Owns the persisted [`UsageRecord`].
///
/// Incremental updates are read-modify-write cycles guarded by the option's
/// version, so concurrent deltas never overwrite each other. A lost race is
/// retried on top of the winner's value.
#[derive(Debug, Clone)]
pub struct UsageStore {
    options: Arc<dyn OptionStore>,
    events: Arc<dyn EventSink>,
    max_update_retries: u32,
}

impl UsageStore {
    /// Create a store. `max_update_retries` is floored at one attempt.
    pub fn new(
        options: Arc<dyn OptionStore>,
        events: Arc<dyn EventSink>,
        max_update_retries: u32,
    ) -> Self {
        Self {
            options,
            events,
            max_update_retries: max_update_retries.max(1),
        }
    }

    /// The tracked total, 0 if the record was never written.
    pub async fn get_current_usage(&self) -> AppResult<u64> {
        Ok(self
            .get_record()
            .await?
            .map_or(0, |record| record.total_bytes))
    }

    /// The full record, if one exists.
    pub async fn get_record(&self) -> AppResult<Option<UsageRecord>> {
        let stored = self.options.get(USAGE_OPTION).await?;
        Ok(stored.as_ref().and_then(decode))
    }

    /// Add a signed delta, clamping the total at zero. Returns the new total.
    pub async fn apply_delta(&self, delta: i64) -> AppResult<u64> {
        for attempt in 1..=self.max_update_retries {
            let current = self.options.get(USAGE_OPTION).await?;
            let base = current
                .as_ref()
                .and_then(decode)
                .unwrap_or_else(|| UsageRecord::new(0));
            let next = base.with_delta(delta);

            let written = self
                .options
                .compare_and_swap(
                    USAGE_OPTION,
                    current.as_ref().map(|c| c.version),
                    &serde_json::to_value(next)?,
                )
                .await?;

            if written {
                debug!(delta, total_bytes = next.total_bytes, "Usage updated");
                self.events.publish(
                    UsageEvent::UsageUpdated {
                        total_bytes: next.total_bytes,
                        delta,
                    }
                    .into(),
                );
                return Ok(next.total_bytes);
            }
            debug!(attempt, delta, "Usage record changed concurrently, retrying");
        }

        Err(AppError::conflict(format!(
            "Usage update of {delta} bytes lost {} consecutive races",
            self.max_update_retries
        )))
    }

    /// Replace the total wholesale.
    pub async fn overwrite(&self, total_bytes: u64) -> AppResult<()> {
        let record = UsageRecord::new(total_bytes);
        self.options
            .put(USAGE_OPTION, &serde_json::to_value(record)?)
            .await?;
        self.events.publish(
            UsageEvent::UsageUpdated {
                total_bytes,
                delta: i64::try_from(total_bytes).unwrap_or(i64::MAX),
            }
            .into(),
        );
        Ok(())
    }

    /// Discard the record; the next read reports 0.
    pub async fn clear(&self) -> AppResult<()> {
        self.options.delete(USAGE_OPTION).await?;
        self.events.publish(UsageEvent::UsageCleared.into());
        Ok(())
    }
}

/// A record that does not parse is treated as never written.
fn decode(stored: &VersionedValue) -> Option<UsageRecord> {
    match serde_json::from_value(stored.value.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed usage record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use serde_json::json;
    use slm_core::error::ErrorKind;
    use slm_database::memory::MemoryOptionStore;

    fn store_with(options: Arc<MemoryOptionStore>) -> UsageStore {
        UsageStore::new(options, Arc::new(EventBus::default()), 16)
    }

    /// Before its first conditional write, clears the record and lets
    /// another writer re-create it with 5 bytes.
    #[derive(Debug)]
    struct ClearingRace {
        inner: MemoryOptionStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl OptionStore for ClearingRace {
        async fn get(&self, name: &str) -> AppResult<Option<VersionedValue>> {
            self.inner.get(name).await
        }

        async fn put(&self, name: &str, value: &serde_json::Value) -> AppResult<()> {
            self.inner.put(name, value).await
        }

        async fn compare_and_swap(
            &self,
            name: &str,
            expected_version: Option<i64>,
            value: &serde_json::Value,
        ) -> AppResult<bool> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner.delete(name).await?;
                let fresh = serde_json::to_value(UsageRecord::new(5))?;
                assert!(self.inner.compare_and_swap(name, None, &fresh).await?);
            }
            self.inner
                .compare_and_swap(name, expected_version, value)
                .await
        }

        async fn delete(&self, name: &str) -> AppResult<bool> {
            self.inner.delete(name).await
        }
    }

    #[tokio::test]
    async fn test_uninitialised_usage_is_zero() {
        let store = store_with(Arc::new(MemoryOptionStore::new()));
        assert_eq!(store.get_current_usage().await.unwrap(), 0);
        assert!(store.get_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_delta_accumulates_and_clamps() {
        let store = store_with(Arc::new(MemoryOptionStore::new()));
        assert_eq!(store.apply_delta(1000).await.unwrap(), 1000);
        assert_eq!(store.apply_delta(-300).await.unwrap(), 700);
        assert_eq!(store.apply_delta(-5000).await.unwrap(), 0);
        assert_eq!(store.get_current_usage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_and_clear() {
        let store = store_with(Arc::new(MemoryOptionStore::new()));
        store.apply_delta(10).await.unwrap();
        store.overwrite(4096).await.unwrap();
        assert_eq!(store.get_current_usage().await.unwrap(), 4096);

        store.clear().await.unwrap();
        assert_eq!(store.get_current_usage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delta_after_clear_and_recreate_is_not_lost() {
        let inner = MemoryOptionStore::new();
        inner
            .put(USAGE_OPTION, &serde_json::to_value(UsageRecord::new(100)).unwrap())
            .await
            .unwrap();
        let options = Arc::new(ClearingRace {
            inner,
            raced: AtomicBool::new(false),
        });
        let store = UsageStore::new(options, Arc::new(EventBus::default()), 4);

        assert_eq!(store.apply_delta(10).await.unwrap(), 15);
        assert_eq!(store.get_current_usage().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_malformed_record_reads_as_zero() {
        let options = Arc::new(MemoryOptionStore::new());
        options
            .put(USAGE_OPTION, &json!({"unexpected": true}))
            .await
            .unwrap();
        let store = store_with(options);
        assert_eq!(store.get_current_usage().await.unwrap(), 0);
        assert_eq!(store.apply_delta(5).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let options = Arc::new(MemoryOptionStore::new());
        let store = store_with(options.clone());
        options.set_unavailable(true);

        let err = store.get_current_usage().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);
        let err = store.apply_delta(1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);
    }

    #[tokio::test]
    async fn test_emits_usage_updated() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let store = UsageStore::new(Arc::new(MemoryOptionStore::new()), bus, 4);
        store.apply_delta(-10).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "usage_updated");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deltas_are_not_lost() {
        let store = Arc::new(UsageStore::new(
            Arc::new(MemoryOptionStore::new()),
            Arc::new(EventBus::default()),
            1000,
        ));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.apply_delta(100).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.get_current_usage().await.unwrap(), 5000);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_usage_never_negative(deltas in proptest::collection::vec(-10_000i64..10_000, 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = store_with(Arc::new(MemoryOptionStore::new()));
                let mut expected: i64 = 0;
                for delta in deltas {
                    let total = store.apply_delta(delta).await.unwrap();
                    expected = (expected + delta).max(0);
                    assert_eq!(total as i64, expected);
                }
            });
        }
    }
}
