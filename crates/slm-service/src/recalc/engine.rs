//! Full rescan of the object store.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use slm_core::events::UsageEvent;
use slm_core::result::AppResult;
use slm_core::traits::{EventSink, ObjectHandle, ObjectStore};
use slm_entity::usage::RecalculationReport;

use crate::usage::UsageStore;

/// Files stat'ed concurrently within one page.
const STAT_CONCURRENCY: usize = 8;

/// Recomputes total usage from scratch.
///
/// The sum is built in a local accumulator and committed with a single
/// overwrite, so concurrent runs never expose partial totals. If listing or
/// stat'ing fails the scan aborts and the stored total is left alone.
#[derive(Debug, Clone)]
pub struct RecalculationEngine {
    objects: Arc<dyn ObjectStore>,
    store: Arc<UsageStore>,
    events: Arc<dyn EventSink>,
    page_size: u64,
}

impl RecalculationEngine {
    /// Create an engine listing `page_size` objects per page.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        store: Arc<UsageStore>,
        events: Arc<dyn EventSink>,
        page_size: u64,
    ) -> Self {
        Self {
            objects,
            store,
            events,
            page_size: page_size.max(1),
        }
    }

    /// Rescan every object and commit the sum of the files that exist.
    pub async fn recalculate(&self) -> AppResult<RecalculationReport> {
        let started = Instant::now();
        let mut report = RecalculationReport::default();
        let mut offset = 0u64;

        loop {
            let page = self.objects.list_objects(self.page_size, offset).await?;
            if page.is_empty() {
                break;
            }

            let lookups: Vec<_> = page.iter().map(|object| self.object_size(object)).collect();
            let sizes: Vec<Option<u64>> = stream::iter(lookups)
                .buffered(STAT_CONCURRENCY)
                .try_collect()
                .await?;

            for size in sizes {
                match size {
                    Some(bytes) => {
                        report.total_bytes = report.total_bytes.saturating_add(bytes);
                        report.processed_count += 1;
                    }
                    None => report.missing_count += 1,
                }
            }

            debug!(offset, page_len = page.len(), "Scanned object page");
            if (page.len() as u64) < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        self.store.overwrite(report.total_bytes).await?;

        info!(
            total_bytes = report.total_bytes,
            processed = report.processed_count,
            missing = report.missing_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Usage recalculated"
        );
        self.events.publish(
            UsageEvent::UsageRecalculated {
                total_bytes: report.total_bytes,
                processed: report.processed_count,
                missing: report.missing_count,
            }
            .into(),
        );

        Ok(report)
    }

    /// Size of an object's file, `None` if it has no path or no file.
    async fn object_size(&self, object: &ObjectHandle) -> AppResult<Option<u64>> {
        let Some(path) = self.objects.resolve_file(object).await? else {
            debug!(object_id = %object.id, "Object has no file path");
            return Ok(None);
        };
        let size = self.objects.file_size(&path).await?;
        if size.is_none() {
            debug!(object_id = %object.id, path = %path.display(), "Object file missing");
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use slm_core::error::ErrorKind;
    use slm_database::memory::{MemoryObjectStore, MemoryOptionStore};

    struct Fixture {
        objects: Arc<MemoryObjectStore>,
        store: Arc<UsageStore>,
        engine: RecalculationEngine,
    }

    fn fixture(page_size: u64) -> Fixture {
        let objects = Arc::new(MemoryObjectStore::new());
        let events = Arc::new(EventBus::default());
        let store = Arc::new(UsageStore::new(
            Arc::new(MemoryOptionStore::new()),
            events.clone(),
            4,
        ));
        let engine = RecalculationEngine::new(objects.clone(), store.clone(), events, page_size);
        Fixture {
            objects,
            store,
            engine,
        }
    }

    #[tokio::test]
    async fn test_pages_and_missing_files() {
        let fx = fixture(100);
        let mut expected = 0u64;
        for i in 0..250u64 {
            let path = format!("/uploads/{i}.bin");
            let missing = matches!(i, 7 | 120 | 249);
            let size = 1000 + i;
            fx.objects
                .insert(
                    &i.to_string(),
                    Some("image/png"),
                    Some(&path),
                    (!missing).then_some(size),
                )
                .await;
            if !missing {
                expected += size;
            }
        }

        let report = fx.engine.recalculate().await.unwrap();
        assert_eq!(report.processed_count, 247);
        assert_eq!(report.missing_count, 3);
        assert_eq!(report.total_bytes, expected);
        assert_eq!(fx.store.get_current_usage().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_object_without_path_counts_missing() {
        let fx = fixture(10);
        fx.objects.insert("a", None, None, None).await;
        fx.objects.insert("b", None, Some("/b"), Some(5)).await;

        let report = fx.engine.recalculate().await.unwrap();
        assert_eq!(report.total_bytes, 5);
        assert_eq!(report.missing_count, 1);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let fx = fixture(2);
        for i in 0..4 {
            fx.objects
                .insert(&format!("o{i}"), None, Some(&format!("/o{i}")), Some(10))
                .await;
        }
        let report = fx.engine.recalculate().await.unwrap();
        assert_eq!(report.processed_count, 4);
        assert_eq!(report.total_bytes, 40);
    }

    #[tokio::test]
    async fn test_empty_store_resets_drift() {
        let fx = fixture(100);
        fx.store.apply_delta(12345).await.unwrap();
        let report = fx.engine.recalculate().await.unwrap();
        assert_eq!(report, RecalculationReport::default());
        assert_eq!(fx.store.get_current_usage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_without_changes() {
        let fx = fixture(3);
        for i in 0..7 {
            fx.objects
                .insert(&format!("o{i}"), None, Some(&format!("/o{i}")), Some(i * 3))
                .await;
        }
        let first = fx.engine.recalculate().await.unwrap();
        let second = fx.engine.recalculate().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_listing_failure_leaves_total_untouched() {
        let fx = fixture(100);
        fx.store.apply_delta(500).await.unwrap();
        fx.objects.set_unavailable(true);

        let err = fx.engine.recalculate().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(fx.store.get_current_usage().await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_emits_recalculated_event() {
        let objects = Arc::new(MemoryObjectStore::new());
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let store = Arc::new(UsageStore::new(
            Arc::new(MemoryOptionStore::new()),
            bus.clone(),
            4,
        ));
        let engine = RecalculationEngine::new(objects, store, bus, 100);
        engine.recalculate().await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(names, vec!["usage_updated", "usage_recalculated"]);
    }
}
